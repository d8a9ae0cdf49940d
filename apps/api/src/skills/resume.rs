use serde::Deserialize;
use tracing::{debug, warn};

use crate::documents::usable_text;
use crate::llm_client::{call_json, prompts::with_json_contract, EvaluationOracle};
use crate::skills::prompts::{resume_cgpa_user, RESUME_CGPA_SYSTEM};

/// Resume text beyond this many characters is not sent to the oracle.
pub const MAX_RESUME_CHARS: usize = 5000;

#[derive(Debug, Deserialize)]
struct CgpaReply {
    #[serde(default)]
    cgpa: Option<serde_json::Value>,
}

/// Asks the oracle for the CGPA/GPA stated in `resume_text`.
///
/// `None` is a normal outcome: too little text, nothing found, or the oracle
/// was unavailable.
pub async fn extract_cgpa(oracle: &dyn EvaluationOracle, resume_text: &str) -> Option<String> {
    let Some(text) = usable_text(resume_text) else {
        warn!("Resume text is empty or too short; skipping CGPA extraction");
        return None;
    };
    let truncated: String = text.chars().take(MAX_RESUME_CHARS).collect();

    let system = with_json_contract(RESUME_CGPA_SYSTEM);
    match call_json::<CgpaReply>(oracle, &system, &resume_cgpa_user(&truncated)).await {
        Ok(reply) => {
            let cgpa = reply.cgpa.and_then(cgpa_as_string);
            debug!(found = cgpa.is_some(), "CGPA extraction finished");
            cgpa
        }
        Err(e) => {
            warn!("CGPA extraction unavailable: {e}");
            None
        }
    }
}

fn cgpa_as_string(value: serde_json::Value) -> Option<String> {
    let raw = match value {
        serde_json::Value::String(s) => s,
        serde_json::Value::Number(n) => n.to_string(),
        _ => return None,
    };
    let trimmed = raw.trim();
    match trimmed.to_ascii_lowercase().as_str() {
        "" | "null" | "none" | "n/a" => None,
        _ => Some(trimmed.to_string()),
    }
}
