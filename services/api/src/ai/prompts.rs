//! services/api/src/ai/prompts.rs
//!
//! Prompt templates and static fallback texts for the AI pipeline.
//! Every template carries the medical disclaimer; the assistant organizes
//! and explains information, it never gives medical advice.

use careprep_core::domain::{ChatMode, DocumentAnalysis, FollowUp, Symptom, VisitSummary};

pub const MEDICAL_DISCLAIMER: &str = r#"
IMPORTANT MEDICAL DISCLAIMER:
- This information is for EDUCATIONAL and ORGANIZATIONAL purposes ONLY
- This is NOT medical advice, diagnosis, or treatment
- ALWAYS consult a qualified healthcare professional for medical decisions
- In case of emergency, call emergency services immediately
"#;

const SYSTEM_PROMPT_CORE: &str = r#"You are CarePrep AI, a friendly medical intelligence assistant that helps patients:
1. Prepare for doctor visits by organizing symptom information
2. Understand medical documents in simple, plain language

CRITICAL RULES YOU MUST ALWAYS FOLLOW:
- You are NOT a doctor and you do NOT provide medical advice
- You do NOT diagnose conditions
- You do NOT recommend treatments or medications
- You ALWAYS suggest consulting healthcare professionals
- You speak in friendly, calm, non-technical language
- You help ORGANIZE and UNDERSTAND information, not make medical decisions"#;

fn system_prompt_base() -> String {
    format!("{SYSTEM_PROMPT_CORE}\n{MEDICAL_DISCLAIMER}")
}

fn symptom_log_line(s: &Symptom) -> String {
    let notes = if s.notes.is_empty() { "None" } else { &s.notes };
    format!(
        "- {}: {} (Severity: {}/10) - Notes: {}",
        s.date, s.symptom, s.severity, notes
    )
}

/// Prompt for summarizing the symptom log ahead of a doctor visit.
pub fn symptom_summary_prompt(symptoms: &[Symptom]) -> String {
    let symptoms_text = symptoms
        .iter()
        .map(symptom_log_line)
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"{base}

TASK: Create a clear, organized summary of the patient's symptoms that they can share with their doctor.

PATIENT'S SYMPTOM LOG:
{symptoms_text}

Please provide:
1. A brief overview of the symptom patterns
2. Timeline of symptoms (when they started, any changes)
3. Severity trends (are symptoms getting better, worse, or stable?)
4. Key points the patient should mention to their doctor
5. Suggested questions the patient might want to ask

Remember: This is to help the patient ORGANIZE information for their doctor, not to provide medical advice.

Format the response in a clear, easy-to-read way that the patient can share with their healthcare provider."#,
        base = system_prompt_base()
    )
}

/// Prompt used by the fallback LLM for a document it cannot read. Keyed on
/// file name and type only; the structured sections match the primary
/// backend's output format so the same parser applies.
pub fn document_fallback_prompt(file_name: &str, file_type: &str) -> String {
    format!(
        r#"{base}

TASK: A patient uploaded a medical document named "{file_name}" (type: {file_type}).
The document content is not available to you. Explain, in general terms, what a
document of this kind usually contains and how the patient can prepare to discuss
it with their doctor. Do NOT invent specific findings, results, or values.

Please provide:

1. **PATIENT-FRIENDLY SUMMARY** (3-5 paragraphs)
   - Explain in simple, everyday language what this kind of document typically covers
   - Avoid medical jargon - if you must use a medical term, explain it
   - Make clear that the patient should review the actual content with their doctor

2. **MEDICATIONS** (if typically relevant)
   For each medication consideration, provide in JSON-like format:
   - name: medication name

3. **FOLLOW-UP ACTIONS**
   List general follow-up actions:
   - action: what needs to be done

4. **RED FLAGS** (warning signs to watch for)
   List general situations that would require immediate medical attention.
   These are for AWARENESS only - always call emergency services for actual emergencies.

Format your response as structured sections that can be easily parsed."#,
        base = system_prompt_base()
    )
}

fn chat_symptom_line(s: &Symptom) -> String {
    format!(
        "- {} (Severity: {}/10) on {}",
        s.symptom, s.severity, s.date
    )
}

/// Prompt for the pre-visit chat mode, embedding up to ten recent symptoms.
pub fn pre_visit_chat_prompt(message: &str, symptoms: &[Symptom]) -> String {
    let symptoms_context = if symptoms.is_empty() {
        "No symptoms logged yet.".to_string()
    } else {
        let lines = symptoms
            .iter()
            .take(10)
            .map(chat_symptom_line)
            .collect::<Vec<_>>()
            .join("\n");
        format!("Patient's recent symptoms:\n{lines}")
    };

    format!(
        r#"{base}

MODE: PRE-VISIT PREPARATION
You are helping the patient prepare for their upcoming doctor's appointment.

{symptoms_context}

PATIENT'S QUESTION: {message}

Provide a helpful, friendly response that:
1. Helps them organize their thoughts for the doctor visit
2. Suggests what information might be useful to share
3. Recommends questions they might want to ask
4. Reminds them that their doctor is the best source for medical advice

Keep your response conversational and supportive. Do NOT provide medical advice or diagnoses.

End your response with a brief reminder to discuss concerns with their healthcare provider."#,
        base = system_prompt_base()
    )
}

/// Prompt for the post-visit chat mode, embedding the latest visit summary.
pub fn post_visit_chat_prompt(message: &str, summary: Option<&VisitSummary>) -> String {
    let summary_context = match summary {
        Some(s) => {
            let medications = s
                .medications
                .iter()
                .map(|m| m.name.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            format!(
                "Recent visit summary:\n{}\n\nMedications: {}",
                s.patient_summary, medications
            )
        }
        None => "No visit summary available.".to_string(),
    };

    format!(
        r#"{base}

MODE: POST-VISIT UNDERSTANDING
You are helping the patient understand their recent medical visit and documents.

{summary_context}

PATIENT'S QUESTION: {message}

Provide a helpful, friendly response that:
1. Helps them understand medical terms in simple language
2. Clarifies any confusing information from their visit
3. Helps them remember important follow-up actions
4. Encourages them to contact their doctor if they have medical concerns

Keep your response conversational and reassuring. Do NOT provide medical advice.

If they ask about changing medications or treatments, remind them to consult their healthcare provider.

End your response with a brief reminder that you're here to help them understand, not to provide medical advice."#,
        base = system_prompt_base()
    )
}

//=========================================================================================
// Static fallback texts (the last tier of the pipeline; cannot fail)
//=========================================================================================

/// Hardcoded chat reply used when every AI option is unavailable. Echoes the
/// user's verbatim question and always carries the disclaimer.
pub fn static_chat_reply(message: &str, mode: ChatMode) -> String {
    match mode {
        ChatMode::PreVisit => format!(
            r#"I understand you have a question about preparing for your doctor visit.

While I can't provide specific advice right now, here are some general tips:

1. **Write down your symptoms** - Note when they started, how often they occur, and their severity
2. **List your medications** - Include supplements and over-the-counter drugs
3. **Prepare your questions** - Write them down so you don't forget
4. **Bring relevant documents** - Test results, previous records, etc.

Your question was: "{message}"

Please discuss this with your healthcare provider during your visit.
{MEDICAL_DISCLAIMER}"#
        ),
        ChatMode::PostVisit => format!(
            r#"I understand you have a question about your visit notes.

While I can't process your specific question right now, here's general guidance:

1. **Review your documents** - Read through them carefully
2. **Note any unclear terms** - Ask your doctor to explain
3. **Follow medication instructions** - Take as prescribed
4. **Schedule follow-ups** - As recommended by your doctor

Your question was: "{message}"

For specific questions about your treatment, please contact your healthcare provider.
{MEDICAL_DISCLAIMER}"#
        ),
    }
}

/// Fully static document analysis, keyed on the file name alone. The result
/// is templated, not document-grounded; callers surface that provenance.
pub fn static_document_analysis(file_name: &str) -> DocumentAnalysis {
    let patient_summary = format!(
        r#"Your document "{file_name}" has been received, but automated analysis is unavailable right now.

For a detailed explanation of this document, please consult with your healthcare provider.
{MEDICAL_DISCLAIMER}"#
    );

    DocumentAnalysis {
        processed_text: patient_summary.clone(),
        doctor_summary: format!("Uploaded document: {file_name} (analysis unavailable)"),
        patient_summary,
        medications: Vec::new(),
        follow_ups: vec![FollowUp {
            action: "Discuss this document with your healthcare provider".to_string(),
            timing: "At your next appointment".to_string(),
        }],
        red_flags: vec![
            "Contact your doctor if you have questions about this document".to_string()
        ],
    }
}

/// Deterministic digest of the symptom log: up to ten most recent entries
/// plus the fixed next-steps footer and disclaimer.
pub fn static_symptom_digest(symptoms: &[Symptom]) -> String {
    let bullet_lines = symptoms
        .iter()
        .rev()
        .take(10)
        .map(|s| {
            let mut line = format!("• {}: {} (Severity: {}/10)", s.date, s.symptom, s.severity);
            if !s.notes.is_empty() {
                line.push_str(&format!(" - Notes: {}", s.notes));
            }
            line
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"**Symptom Summary for Your Doctor**

You have logged {count} symptom(s). Here's a summary to share with your healthcare provider:

{bullet_lines}

**Next Steps:**
• Discuss these symptoms with your doctor
• Mention any patterns you've noticed
• Ask about possible causes and treatments
{MEDICAL_DISCLAIMER}"#,
        count = symptoms.len()
    )
}
