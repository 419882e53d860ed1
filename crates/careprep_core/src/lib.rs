pub mod domain;
pub mod ports;

pub use domain::{
    ChatMode, Document, DocumentAnalysis, FollowUp, Identity, Medication, NewDocument, NewSymptom,
    NewVisitSummary, Symptom, VisitSummary,
};
pub use ports::{
    AiProvider, AuthError, ChatRequest, DocumentRequest, FileStore, PortError, PortResult,
    ProviderError, ProviderResult, RecordStore, TokenVerifier,
};
