/// Decides whether a text concerns markets at all. Texts it rejects
/// classify as `irrelevant` without keyword matching.
pub trait RelevanceFilter: Send + Sync {
    fn is_relevant(&self, text: &str) -> bool;
}

/// Accepts every text
#[derive(Debug, Clone, Copy, Default)]
pub struct AssumeRelevant;

impl RelevanceFilter for AssumeRelevant {
    fn is_relevant(&self, _text: &str) -> bool {
        true
    }
}

/// Rejects texts containing any deny-listed phrase
#[derive(Debug, Clone)]
pub struct DenyListFilter {
    phrases: Vec<String>,
}

impl DenyListFilter {
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Self {
        Self {
            phrases: phrases.iter().map(|p| p.as_ref().to_lowercase()).collect(),
        }
    }
}

impl Default for DenyListFilter {
    fn default() -> Self {
        Self::new(&[
            "my pet",
            "my dog",
            "my cat",
            "mascota",
            "celebrity",
            "concert",
            "concierto",
            "recipe",
            "receta",
        ])
    }
}

impl RelevanceFilter for DenyListFilter {
    fn is_relevant(&self, text: &str) -> bool {
        let lowered = text.to_lowercase();
        !self.phrases.iter().any(|p| lowered.contains(p.as_str()))
    }
}
