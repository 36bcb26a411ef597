//! Intent parsing: structured, LLM-assisted, and keyword rules.
//!
//! Mode selection follows the request's input type and LLM availability.
//! The LLM path falls through to the keyword rules on any failure, so a
//! natural-language request always yields an intent.

use finmesh_llm::{strip_code_fence, LlmClient};
use finmesh_types::{DataMap, Intent, IntentLabel};
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("structured input is not a JSON object: {0}")]
    NotAnObject(String),

    #[error("structured input is missing the intent field")]
    MissingIntent,

    #[error("structured input carries unknown intent '{0}'")]
    UnknownIntent(String),
}

/// How the caller encoded the input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InputType {
    NaturalLanguage,
    Structured,
}

pub struct IntentParser {
    llm: Option<Arc<LlmClient>>,
    amount_re: Regex,
    bare_amount_re: Regex,
    account_re: Regex,
    ifsc_re: Regex,
}

impl IntentParser {
    pub fn new(llm: Option<Arc<LlmClient>>) -> Self {
        Self {
            llm: llm.filter(|client| client.is_enabled()),
            amount_re: Regex::new(r"(?i)(?:rs\.?|inr|₹)\s*([0-9][0-9,]*(?:\.[0-9]+)?)")
                .expect("static regex"),
            bare_amount_re: Regex::new(r"\b([0-9][0-9,]*(?:\.[0-9]+)?)\b").expect("static regex"),
            account_re: Regex::new(r"(?i)(?:account|acc|ac)\s*(?:number|no\.?|#)?\s*[:\-]?\s*([0-9xX]{4,})")
                .expect("static regex"),
            ifsc_re: Regex::new(r"\b([A-Z]{4}0[A-Z0-9]{6})\b").expect("static regex"),
        }
    }

    /// Parse user input into an intent.
    pub async fn parse(&self, input: &Value, input_type: InputType) -> Result<Intent, ParseError> {
        match input_type {
            InputType::Structured => self.parse_structured(input),
            InputType::NaturalLanguage => {
                let text = match input {
                    Value::String(text) => text.clone(),
                    other => other.to_string(),
                };
                if let Some(llm) = &self.llm {
                    match self.parse_llm(llm, &text).await {
                        Some(intent) => return Ok(intent),
                        None => debug!("LLM parse failed, falling through to rules"),
                    }
                }
                Ok(self.parse_rules(&text))
            }
        }
    }

    /// Structured mode: a JSON object with `intent` and optional `entities`.
    fn parse_structured(&self, input: &Value) -> Result<Intent, ParseError> {
        let parsed;
        let object = match input {
            Value::Object(object) => object,
            Value::String(raw) => {
                parsed = serde_json::from_str::<Value>(raw)
                    .map_err(|e| ParseError::NotAnObject(e.to_string()))?;
                match &parsed {
                    Value::Object(object) => object,
                    other => return Err(ParseError::NotAnObject(other.to_string())),
                }
            }
            other => return Err(ParseError::NotAnObject(other.to_string())),
        };

        let label = object
            .get("intent")
            .and_then(Value::as_str)
            .ok_or(ParseError::MissingIntent)?;
        let intent_type: IntentLabel = label
            .parse()
            .map_err(|_| ParseError::UnknownIntent(label.to_string()))?;
        let entities = match object.get("entities") {
            Some(Value::Object(entities)) => entities.clone(),
            _ => DataMap::new(),
        };

        Ok(Intent::new(intent_type, 1.0, input.to_string()).with_entities(entities))
    }

    /// LLM mode: templated prompt requesting `{intent, confidence, entities}`.
    async fn parse_llm(&self, llm: &LlmClient, text: &str) -> Option<Intent> {
        let labels = [
            "TRANSFER_NEFT",
            "TRANSFER_RTGS",
            "TRANSFER_IMPS",
            "TRANSFER_UPI",
            "CHECK_BALANCE",
            "GET_STATEMENT",
            "ADD_BENEFICIARY",
            "APPLY_LOAN",
            "CREDIT_SCORE",
            "CONVERSATIONAL",
            "UNKNOWN",
        ]
        .join(", ");
        let prompt = format!(
            "Classify this banking request into one intent from [{labels}].\n\
             Extract entities such as amount, to_account and ifsc.\n\
             Respond with JSON only: {{\"intent\": ..., \"confidence\": 0..1, \"entities\": {{...}}}}\n\n\
             Request: {text}"
        );
        let raw = match llm.complete(None, &prompt).await {
            Ok(raw) => raw,
            Err(err) => {
                warn!(error = %err, "LLM intent classification failed");
                return None;
            }
        };
        let body: Value = serde_json::from_str(strip_code_fence(&raw)).ok()?;
        let intent_type: IntentLabel = body.get("intent")?.as_str()?.parse().ok()?;
        let confidence = body
            .get("confidence")
            .and_then(Value::as_f64)
            .unwrap_or(0.8);
        let entities = match body.get("entities") {
            Some(Value::Object(entities)) => entities.clone(),
            _ => DataMap::new(),
        };
        Some(Intent::new(intent_type, confidence, text).with_entities(entities))
    }

    /// Rule mode: keyword classification plus regex entity extraction.
    pub fn parse_rules(&self, text: &str) -> Intent {
        let lower = text.to_lowercase();
        let (intent_type, confidence) = classify_keywords(&lower);
        let entities = self.extract_entities(text, &lower);
        Intent::new(intent_type, confidence, text).with_entities(entities)
    }

    fn extract_entities(&self, original: &str, lower: &str) -> DataMap {
        let mut entities = DataMap::new();

        let account = self
            .account_re
            .captures(lower)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_ascii_uppercase());
        if let Some(account) = &account {
            entities.insert("to_account".to_string(), Value::from(account.clone()));
        }

        if let Some(captures) = self.ifsc_re.captures(&original.to_ascii_uppercase()) {
            entities.insert(
                "ifsc".to_string(),
                Value::from(captures[1].to_string()),
            );
        }

        let amount = self
            .amount_re
            .captures(lower)
            .and_then(|captures| captures.get(1))
            .map(|m| m.as_str().to_string())
            .or_else(|| {
                // Without a currency marker, take the first number that is
                // not the account reference.
                self.bare_amount_re
                    .captures_iter(lower)
                    .map(|captures| captures[1].to_string())
                    .find(|candidate| {
                        account
                            .as_ref()
                            .map(|account| !account.eq_ignore_ascii_case(candidate))
                            .unwrap_or(true)
                    })
            });
        if let Some(raw) = amount {
            if let Ok(value) = raw.replace(',', "").parse::<f64>() {
                entities.insert("amount".to_string(), Value::from(value));
            }
        }

        entities
    }
}

/// Keyword table, checked in priority order.
fn classify_keywords(lower: &str) -> (IntentLabel, f64) {
    let has = |needles: &[&str]| needles.iter().any(|needle| lower.contains(needle));

    if has(&["neft", "transfer", "send money", "pay"]) {
        (IntentLabel::TransferNeft, 0.9)
    } else if has(&["rtgs"]) {
        (IntentLabel::TransferRtgs, 0.9)
    } else if has(&["imps"]) {
        (IntentLabel::TransferImps, 0.9)
    } else if has(&["upi", "scan qr"]) {
        (IntentLabel::TransferUpi, 0.9)
    } else if has(&["balance", "how much"]) {
        (IntentLabel::CheckBalance, 0.95)
    } else if has(&["statement", "history", "transactions"]) {
        (IntentLabel::GetStatement, 0.9)
    } else if has(&["add beneficiary", "add payee"]) {
        (IntentLabel::AddBeneficiary, 0.9)
    } else if has(&["loan"]) {
        (IntentLabel::ApplyLoan, 0.85)
    } else if has(&["credit score", "cibil"]) {
        (IntentLabel::CreditScore, 0.85)
    } else if has(&["hello", "hi", "thanks", "bye", "capabilities"]) {
        (IntentLabel::Conversational, 0.9)
    } else {
        (IntentLabel::Unknown, 0.3)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use finmesh_types::map_f64;
    use serde_json::json;

    fn parser() -> IntentParser {
        IntentParser::new(None)
    }

    #[tokio::test]
    async fn structured_input_has_full_confidence() {
        let input = json!({"intent": "TRANSFER_NEFT", "entities": {"amount": 5000}});
        let intent = parser().parse(&input, InputType::Structured).await.unwrap();
        assert_eq!(intent.intent_type, IntentLabel::TransferNeft);
        assert_eq!(intent.confidence, 1.0);
        assert_eq!(map_f64(&intent.entities, "amount"), Some(5000.0));
    }

    #[tokio::test]
    async fn structured_without_intent_errors() {
        let input = json!({"entities": {}});
        assert!(matches!(
            parser().parse(&input, InputType::Structured).await,
            Err(ParseError::MissingIntent)
        ));
    }

    #[tokio::test]
    async fn structured_with_unknown_label_errors() {
        let input = json!({"intent": "BUY_GOLD"});
        assert!(matches!(
            parser().parse(&input, InputType::Structured).await,
            Err(ParseError::UnknownIntent(_))
        ));
    }

    #[test]
    fn balance_queries_classify_with_high_confidence() {
        let intent = parser().parse_rules("Check my balance");
        assert_eq!(intent.intent_type, IntentLabel::CheckBalance);
        assert_eq!(intent.confidence, 0.95);
    }

    #[test]
    fn transfer_with_currency_amount_and_account() {
        let intent =
            parser().parse_rules("transfer Rs. 50,000 to account 12345678 ifsc HDFC0001234");
        assert_eq!(intent.intent_type, IntentLabel::TransferNeft);
        assert_eq!(map_f64(&intent.entities, "amount"), Some(50_000.0));
        assert_eq!(
            intent.entities.get("to_account").and_then(Value::as_str),
            Some("12345678")
        );
        assert_eq!(
            intent.entities.get("ifsc").and_then(Value::as_str),
            Some("HDFC0001234")
        );
    }

    #[test]
    fn bare_amount_skips_the_account_number() {
        let intent = parser().parse_rules("send money 2500 to acc 99887766");
        assert_eq!(map_f64(&intent.entities, "amount"), Some(2500.0));
        assert_eq!(
            intent.entities.get("to_account").and_then(Value::as_str),
            Some("99887766")
        );
    }

    #[test]
    fn masked_account_numbers_extract() {
        let intent = parser().parse_rules("pay 1000 to account XXXX4321");
        assert_eq!(
            intent.entities.get("to_account").and_then(Value::as_str),
            Some("XXXX4321")
        );
    }

    #[test]
    fn rail_specific_keywords_classify() {
        assert_eq!(parser().parse_rules("rtgs 500000 now").intent_type, IntentLabel::TransferRtgs);
        assert_eq!(parser().parse_rules("do an imps").intent_type, IntentLabel::TransferImps);
        assert_eq!(parser().parse_rules("scan qr and go").intent_type, IntentLabel::TransferUpi);
    }

    #[test]
    fn greetings_are_conversational() {
        let intent = parser().parse_rules("hello there");
        assert_eq!(intent.intent_type, IntentLabel::Conversational);
    }

    #[test]
    fn gibberish_is_unknown_with_low_confidence() {
        let intent = parser().parse_rules("fjdsklfj");
        assert_eq!(intent.intent_type, IntentLabel::Unknown);
        assert_eq!(intent.confidence, 0.3);
    }
}
