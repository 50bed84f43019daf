// core/src/entry.rs
use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use ureq::Agent;

use crate::error::EntryError;
use crate::types::MeasurementEntry;

/// Målinger språkmodellen kan returnere (radnavn i måletabellen).
pub const KNOWN_MEASUREMENTS: [&str; 8] = [
    "Gewicht",
    "Vet %",
    "Skeletspiermassa",
    "Visceraal vetniveau",
    "Vetmassa",
    "Lichaamsvocht",
    "Buikomvang",
    "BMI",
];

/// Språkmodellen sett utenfra: prompt inn, råtekst ut.
/// Prod: [`GroqClient`], test: en stub som returnerer faste svar.
pub trait EntryParser {
    fn complete(&self, prompt: &str) -> Result<String, EntryError>;
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Groq (OpenAI-kompatibel chat completions) – enkel blocking-versjon (ureq)
pub struct GroqClient {
    agent: Agent,
    api_key: String,
    base_url: String,
    model: String,
}

impl GroqClient {
    pub const DEFAULT_MODEL: &'static str = "llama-3.3-70b-versatile";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.groq.com/openai/v1";

    pub fn new(api_key: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(Duration::from_secs(30))
            .build();
        Self {
            agent,
            api_key: api_key.into(),
            base_url: Self::DEFAULT_BASE_URL.into(),
            model: Self::DEFAULT_MODEL.into(),
        }
    }

    /// Leser nøkkelen fra `GROQ_API_KEY`.
    pub fn from_env() -> Result<Self, EntryError> {
        match std::env::var("GROQ_API_KEY") {
            Ok(k) if !k.trim().is_empty() => Ok(Self::new(k.trim())),
            _ => Err(EntryError::MissingApiKey),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }
}

impl EntryParser for GroqClient {
    fn complete(&self, prompt: &str) -> Result<String, EntryError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let resp = self
            .agent
            .post(&url)
            .set("Authorization", &format!("Bearer {}", self.api_key))
            .send_json(json!({
                "model": self.model,
                "messages": [{"role": "user", "content": prompt}],
                "temperature": 0.3,
                "max_tokens": 400,
            }))
            .map_err(|e| EntryError::Transport(e.to_string()))?;

        let body: ChatResponse = resp
            .into_json()
            .map_err(|e| EntryError::Transport(e.to_string()))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .ok_or(EntryError::EmptyResponse)
    }
}

pub fn measurement_prompt(text: &str) -> String {
    format!(
        "Je bent een expert in lichaamsmetingen. Analyseer de volgende metingen.\n\n\
         Beschrijving: {text}\n\n\
         Mogelijke metingen om te herkennen: {}.\n\n\
         Geef de output als JSON met alleen de metingen die worden genoemd, \
         bijvoorbeeld {{\"Gewicht\": 105.6, \"Vet %\": 27.9}}. \
         Gebruik exact deze namen voor de keys.\n\n\
         Geef ALLEEN de JSON output, geen extra tekst.",
        KNOWN_MEASUREMENTS.join(", ")
    )
}

/// Fjerner ```json … ``` rundt svaret hvis modellen la det til.
pub fn strip_code_fence(raw: &str) -> &str {
    let t = raw.trim();
    let Some(rest) = t.strip_prefix("```") else {
        return t;
    };
    let body = rest.split("```").next().unwrap_or(rest);
    body.strip_prefix("json").unwrap_or(body).trim()
}

/// Validerer et modellsvar. Ukjente nøkler og `null` hoppes over; minst én
/// kjent måling må finnes.
pub fn validate_measurements(raw: &str) -> Result<MeasurementEntry, EntryError> {
    let value: Value = serde_json::from_str(strip_code_fence(raw))
        .map_err(|e| EntryError::InvalidJson(e.to_string()))?;
    let Value::Object(map) = value else {
        return Err(EntryError::Invalid("expected a JSON object".into()));
    };

    let mut entry = MeasurementEntry::new();
    for (key, v) in map {
        let Some(name) = KNOWN_MEASUREMENTS.iter().find(|k| k.eq_ignore_ascii_case(key.trim())) else {
            log::warn!("ignoring unknown measurement '{key}'");
            continue;
        };
        let number = match &v {
            Value::Null => continue,
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().replace(',', ".").parse::<f64>().ok(),
            _ => None,
        };
        let Some(x) = number.filter(|x| x.is_finite() && *x > 0.0) else {
            return Err(EntryError::Invalid(format!("'{name}' is not a positive number: {v}")));
        };
        if *name == "Vet %" && x > 100.0 {
            return Err(EntryError::Invalid(format!("'Vet %' out of range: {x}")));
        }
        entry.insert(*name, x);
    }

    if entry.is_empty() {
        return Err(EntryError::Invalid("no known measurements in response".into()));
    }
    Ok(entry)
}

/// Fritekst → validerte målinger, med nye forsøk ved feil.
pub fn parse_measurements(
    parser: &dyn EntryParser,
    text: &str,
    attempts: u32,
) -> Result<MeasurementEntry, EntryError> {
    let attempts = attempts.max(1);
    let prompt = measurement_prompt(text);
    let mut last = EntryError::EmptyResponse;

    for attempt in 1..=attempts {
        match parser.complete(&prompt).and_then(|raw| validate_measurements(&raw)) {
            Ok(entry) => return Ok(entry),
            Err(EntryError::MissingApiKey) => return Err(EntryError::MissingApiKey),
            Err(e) => {
                log::warn!("measurement parse attempt {attempt}/{attempts} failed: {e}");
                last = e;
            }
        }
    }
    Err(EntryError::Exhausted {
        attempts,
        last: Box::new(last),
    })
}
