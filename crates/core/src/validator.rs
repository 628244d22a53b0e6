use serde::{Deserialize, Serialize};

pub const MIN_QUERY_CHARS: usize = 4;
const MIN_ARABIC_WITH_LATIN: usize = 3;

/// Phrase lists consulted by [`QueryValidator`]. Matching is done on
/// alef-normalised, lower-cased text; phrases are normalised the same way.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorRules {
    pub life_noise: Vec<String>,
    pub service_hints: Vec<String>,
    pub travel_verbs: Vec<String>,
}

impl Default for ValidatorRules {
    fn default() -> Self {
        Self {
            life_noise: to_strings(&[
                "اتروش",
                "استحم",
                "شاور",
                "اكل",
                "أنام",
                "انام",
                "العب",
                "افطر",
                "غداء",
                "عشاء",
                "ابا اروح",
                "ابي اروح",
            ]),
            service_hints: to_strings(&[
                "ابغى",
                "ابي",
                "أبي",
                "ابا",
                "أبغى",
                "احتاج",
                "أحتاج",
                "كيف",
                "اصدار",
                "إصدار",
                "تجديد",
                "حجز",
                "موعد",
                "بلاغ",
                "تأشيرة",
                "تفويض",
                "وثيقة",
                "سداد",
                "مدفوعات",
                "اقامة",
                "جواز",
                "هوية",
                "رخصة",
                "نقل",
                "مخالفات",
                "سفر",
            ]),
            travel_verbs: to_strings(&["اسافر", "سافر"]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "verdict", content = "phrase", rename_all = "snake_case")]
pub enum Verdict {
    Accepted,
    TooShort,
    NoArabic,
    MostlyLatin,
    LifeNoise(String),
    NoServiceHint,
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }
}

#[derive(Debug, Clone)]
pub struct QueryValidator {
    life_noise: Vec<String>,
    service_hints: Vec<String>,
    travel_verbs: Vec<String>,
}

impl QueryValidator {
    pub fn new(rules: &ValidatorRules) -> Self {
        Self {
            life_noise: normalize_all(&rules.life_noise),
            service_hints: normalize_all(&rules.service_hints),
            travel_verbs: normalize_all(&rules.travel_verbs),
        }
    }

    pub fn validate(&self, text: &str) -> bool {
        self.inspect(text).is_accepted()
    }

    /// Runs the checks in order and reports the first one that fails.
    pub fn inspect(&self, text: &str) -> Verdict {
        let text = text.trim();
        if text.chars().count() < MIN_QUERY_CHARS {
            return Verdict::TooShort;
        }

        let counts = ScriptCounts::of(text);
        if counts.arabic == 0 {
            return Verdict::NoArabic;
        }
        if counts.latin > 0 && counts.arabic < MIN_ARABIC_WITH_LATIN {
            return Verdict::MostlyLatin;
        }

        let folded = normalize_for_match(text);
        if let Some(phrase) = first_contained(&folded, &self.life_noise) {
            return Verdict::LifeNoise(phrase.to_string());
        }

        if first_contained(&folded, &self.service_hints).is_none()
            && first_contained(&folded, &self.travel_verbs).is_none()
        {
            return Verdict::NoServiceHint;
        }

        Verdict::Accepted
    }
}

impl Default for QueryValidator {
    fn default() -> Self {
        Self::new(&ValidatorRules::default())
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct ScriptCounts {
    arabic: usize,
    latin: usize,
}

impl ScriptCounts {
    fn of(text: &str) -> Self {
        let mut counts = Self::default();
        for ch in text.chars() {
            if is_arabic(ch) {
                counts.arabic += 1;
            } else if ch.is_ascii_alphabetic() {
                counts.latin += 1;
            }
        }
        counts
    }
}

pub fn is_arabic(ch: char) -> bool {
    (0x0600..=0x06FF).contains(&(ch as u32))
}

/// Folds the alef variants (أ إ آ) onto bare alef and lower-cases the rest.
pub fn normalize_for_match(text: &str) -> String {
    text.chars()
        .map(|ch| match ch {
            'أ' | 'إ' | 'آ' => 'ا',
            other => other,
        })
        .collect::<String>()
        .to_lowercase()
}

fn normalize_all(phrases: &[String]) -> Vec<String> {
    phrases
        .iter()
        .map(|phrase| normalize_for_match(phrase.trim()))
        .filter(|phrase| !phrase.is_empty())
        .collect()
}

fn first_contained<'a>(input: &str, needles: &'a [String]) -> Option<&'a str> {
    needles
        .iter()
        .find(|needle| input.contains(needle.as_str()))
        .map(String::as_str)
}

fn to_strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
