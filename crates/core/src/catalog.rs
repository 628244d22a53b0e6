use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{IntentDefinition, ServiceAction, ServiceRecord};
use crate::validator::ValidatorRules;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("catalog declares no intents")]
    Empty,
    #[error("intent id must not be blank")]
    BlankIntentId,
    #[error("intent `{0}` lists a blank keyword")]
    BlankKeyword(String),
    #[error("intent id `{0}` is declared more than once")]
    DuplicateIntent(String),
    #[error("services are listed for undeclared intent `{0}`")]
    UnknownServiceIntent(String),
}

/// Immutable intent and service tables, built once at startup and shared by
/// reference afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    intents: Vec<IntentDefinition>,
    #[serde(default)]
    services: BTreeMap<String, Vec<ServiceRecord>>,
    #[serde(default)]
    validator: ValidatorRules,
}

impl Catalog {
    pub fn new(
        intents: Vec<IntentDefinition>,
        services: BTreeMap<String, Vec<ServiceRecord>>,
        validator: ValidatorRules,
    ) -> Result<Self, CatalogError> {
        let catalog = Self {
            intents,
            services,
            validator,
        };
        catalog.check()?;
        Ok(catalog)
    }

    pub fn from_json_str(raw: &str) -> Result<Self> {
        let catalog: Self = serde_json::from_str(raw).context("invalid catalog json")?;
        catalog.check()?;
        Ok(catalog)
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path.as_ref()).with_context(|| {
            format!("failed reading catalog file at {}", path.as_ref().display())
        })?;
        Self::from_json_str(&raw)
            .with_context(|| format!("failed loading catalog from {}", path.as_ref().display()))
    }

    pub fn builtin() -> Self {
        Self {
            intents: builtin_intents(),
            services: builtin_services(),
            validator: ValidatorRules::default(),
        }
    }

    /// Intents in declaration order; this order is the keyword tie-break.
    pub fn intents(&self) -> &[IntentDefinition] {
        &self.intents
    }

    pub fn intent(&self, intent_id: &str) -> Option<&IntentDefinition> {
        self.intents.iter().find(|intent| intent.id == intent_id)
    }

    pub fn contains(&self, intent_id: &str) -> bool {
        self.intent(intent_id).is_some()
    }

    pub fn label_for(&self, intent_id: &str) -> String {
        self.intent(intent_id)
            .map(|intent| intent.label.clone())
            .unwrap_or_else(|| intent_id.to_string())
    }

    pub fn services_for(&self, intent_id: Option<&str>) -> &[ServiceRecord] {
        intent_id
            .and_then(|id| self.services.get(id))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn services(&self) -> &BTreeMap<String, Vec<ServiceRecord>> {
        &self.services
    }

    pub fn validator_rules(&self) -> &ValidatorRules {
        &self.validator
    }

    fn check(&self) -> Result<(), CatalogError> {
        if self.intents.is_empty() {
            return Err(CatalogError::Empty);
        }

        let mut seen = HashSet::new();
        for intent in &self.intents {
            if intent.id.trim().is_empty() {
                return Err(CatalogError::BlankIntentId);
            }
            if !seen.insert(intent.id.as_str()) {
                return Err(CatalogError::DuplicateIntent(intent.id.clone()));
            }
            // a blank keyword would be a substring of every query
            if intent.keywords.iter().any(|keyword| keyword.trim().is_empty()) {
                return Err(CatalogError::BlankKeyword(intent.id.clone()));
            }
        }

        if let Some(orphan) = self.services.keys().find(|id| !seen.contains(id.as_str())) {
            return Err(CatalogError::UnknownServiceIntent(orphan.clone()));
        }

        Ok(())
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::builtin()
    }
}

fn intent(id: &str, label: &str, keywords: &[&str]) -> IntentDefinition {
    IntentDefinition {
        id: id.to_string(),
        label: label.to_string(),
        keywords: keywords.iter().map(|kw| kw.to_string()).collect(),
    }
}

fn service(id: &str, title: &str, description: &str, target: &str) -> ServiceRecord {
    ServiceRecord {
        id: id.to_string(),
        title: title.to_string(),
        description: description.to_string(),
        action: ServiceAction::navigate(target),
    }
}

fn builtin_intents() -> Vec<IntentDefinition> {
    vec![
        intent(
            "travel",
            "السفر والتنقل",
            &[
                "سفر",
                "اسافر",
                "رحلة",
                "تذكرة",
                "مطار",
                "خروج وعودة",
                "تاشيرة",
                "تأشيرة",
            ],
        ),
        intent(
            "appointments",
            "إدارة المواعيد",
            &[
                "موعد",
                "مواعيد",
                "حجز",
                "حجز موعد",
                "الغاء موعد",
                "تعديل موعد",
            ],
        ),
        intent(
            "payments",
            "المدفوعات الحكومية",
            &["سداد", "مدفوعات", "رسوم", "فاتورة", "سدد", "اسدد"],
        ),
        intent(
            "delegation",
            "إدارة التفويض",
            &[
                "تفويض",
                "تفويض شخص",
                "تفويض ابشر",
                "تفويض مركبة",
                "تفويض قيادة",
            ],
        ),
        intent(
            "documents_delivery",
            "توصيل الوثائق",
            &[
                "توصيل",
                "وثائق",
                "عنوان وطني",
                "توصيل الوثيقة",
                "استلام الوثائق",
            ],
        ),
        intent(
            "personal_docs",
            "الوثائق الشخصية",
            &[
                "هوية",
                "جواز",
                "رخصة",
                "تجديد الهوية",
                "تجديد الجواز",
                "انتهاء الرخصة",
            ],
        ),
        intent(
            "fraud_report",
            "البلاغات والاحتيال",
            &[
                "احتيال",
                "نصب",
                "ابتزاز",
                "اختراق",
                "بلاغ",
                "جرائم الانترنت",
            ],
        ),
    ]
}

fn builtin_services() -> BTreeMap<String, Vec<ServiceRecord>> {
    let mut services = BTreeMap::new();

    services.insert(
        "travel".to_string(),
        vec![
            service(
                "passport_check",
                "التحقق من صلاحية الجواز",
                "التحقق من صلاحية جواز السفر للمستفيد والمرافقين.",
                "passport-check",
            ),
            service(
                "travel_permit",
                "إصدار تصريح سفر",
                "تقديم طلب تصريح سفر إلكتروني (محاكاة).",
                "travel-permit",
            ),
            service(
                "visa_services",
                "خدمات التأشيرات",
                "اقتراح المسار المناسب للتأشيرة حسب الحالة (محاكاة).",
                "visa",
            ),
            service(
                "violations_check",
                "التحقق من المخالفات قبل السفر",
                "التأكد من عدم وجود التزامات/مخالفات تعيق السفر (محاكاة).",
                "violations",
            ),
        ],
    );
    services.insert(
        "appointments".to_string(),
        vec![service(
            "manage_appointments",
            "إدارة المواعيد",
            "حجز/تعديل/إلغاء موعد (محاكاة).",
            "appointments",
        )],
    );
    services.insert(
        "payments".to_string(),
        vec![service(
            "gov_payments",
            "المدفوعات الحكومية",
            "سداد الرسوم الحكومية عبر القنوات المتاحة (محاكاة).",
            "payments",
        )],
    );
    services.insert(
        "delegation".to_string(),
        vec![service(
            "manage_delegation",
            "إدارة التفويض",
            "إنشاء/إلغاء تفويض (محاكاة).",
            "delegation",
        )],
    );
    services.insert(
        "documents_delivery".to_string(),
        vec![service(
            "documents_delivery",
            "توصيل الوثائق",
            "طلب توصيل الوثائق لعنوانك الوطني (محاكاة).",
            "documents-delivery",
        )],
    );
    services.insert(
        "personal_docs".to_string(),
        vec![
            service(
                "renew_id",
                "تجديد الهوية الوطنية",
                "متطلبات وخطوات التجديد (محاكاة).",
                "renew-id",
            ),
            service(
                "renew_passport",
                "تجديد جواز السفر",
                "خطوات التجديد والرسوم (محاكاة).",
                "renew-passport",
            ),
        ],
    );
    services.insert(
        "fraud_report".to_string(),
        vec![service(
            "fraud_report",
            "رفع بلاغ احتيال",
            "اختيار نوع البلاغ وتجهيز البيانات (محاكاة).",
            "fraud-report",
        )],
    );

    services
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_catalog_is_consistent() {
        let catalog = Catalog::builtin();
        assert!(catalog.check().is_ok());
        assert_eq!(catalog.intents().len(), 7);
        assert_eq!(catalog.intents()[0].id, "travel");
    }

    #[test]
    fn label_falls_back_to_id() {
        let catalog = Catalog::builtin();
        assert_eq!(catalog.label_for("payments"), "المدفوعات الحكومية");
        assert_eq!(catalog.label_for("lottery"), "lottery");
    }

    #[test]
    fn services_lookup_never_fails() {
        let catalog = Catalog::builtin();
        assert!(catalog.services_for(None).is_empty());
        assert!(catalog.services_for(Some("lottery")).is_empty());

        let ids = catalog
            .services_for(Some("personal_docs"))
            .iter()
            .map(|s| s.id.as_str())
            .collect::<Vec<_>>();
        assert_eq!(ids, vec!["renew_id", "renew_passport"]);
    }

    #[test]
    fn rejects_duplicate_and_orphan_ids() {
        let dup = vec![intent("a", "A", &[]), intent("a", "A2", &[])];
        assert_eq!(
            Catalog::new(dup, BTreeMap::new(), ValidatorRules::default()).unwrap_err(),
            CatalogError::DuplicateIntent("a".to_string())
        );

        let mut services = BTreeMap::new();
        services.insert("b".to_string(), vec![service("s", "S", "", "s")]);
        assert_eq!(
            Catalog::new(vec![intent("a", "A", &[])], services, ValidatorRules::default())
                .unwrap_err(),
            CatalogError::UnknownServiceIntent("b".to_string())
        );
    }

    #[test]
    fn loads_from_json_with_default_validator_rules() {
        let raw = r#"{
            "intents": [{"id": "payments", "label": "المدفوعات", "keywords": ["سداد"]}],
            "services": {
                "payments": [{
                    "id": "gov_payments",
                    "title": "المدفوعات الحكومية",
                    "description": "سداد",
                    "action": {"type": "navigate", "target": "payments"}
                }]
            }
        }"#;

        let catalog = Catalog::from_json_str(raw).unwrap();
        assert!(catalog.contains("payments"));
        assert!(!catalog.contains("travel"));
        assert_eq!(catalog.services_for(Some("payments"))[0].action.kind, "navigate");
        assert!(!catalog.validator_rules().service_hints.is_empty());
    }

    #[test]
    fn json_catalog_is_checked() {
        assert!(Catalog::from_json_str(r#"{"intents": []}"#).is_err());
    }

    #[test]
    fn rejects_blank_keywords() {
        assert_eq!(
            Catalog::new(
                vec![intent("payments", "P", &["سداد", " "])],
                BTreeMap::new(),
                ValidatorRules::default(),
            )
            .unwrap_err(),
            CatalogError::BlankKeyword("payments".to_string())
        );

        let raw = r#"{"intents": [{"id": "travel", "label": "سفر", "keywords": [""]}]}"#;
        assert!(Catalog::from_json_str(raw).is_err());
    }

    #[test]
    fn service_descriptions_keep_the_simulation_marker() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.services_for(Some("appointments"))[0].description,
            "حجز/تعديل/إلغاء موعد (محاكاة)."
        );
        assert_eq!(
            catalog.services_for(Some("delegation"))[0].description,
            "إنشاء/إلغاء تفويض (محاكاة)."
        );

        let marked = catalog
            .services()
            .values()
            .flatten()
            .filter(|service| service.description.ends_with("(محاكاة)."))
            .count();
        assert_eq!(marked, 10);
    }
}
