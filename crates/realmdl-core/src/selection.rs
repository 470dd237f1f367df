//! Realm selection.
//!
//! A single realm is taken without asking. With several, the choice must be
//! explicit: a configured selector, or an operator prompt. There is no
//! default pick.

use crate::error::{RealmError, RealmResult};
use crate::models::Realm;

/// Matches a realm by id or by case-insensitive name.
#[derive(Debug, Clone, PartialEq)]
pub struct RealmSelector(String);

impl RealmSelector {
    pub fn parse(value: &str) -> RealmResult<Self> {
        let value = value.trim();
        if value.is_empty() {
            return Err(RealmError::Configuration(
                "realm selector must not be empty".to_string(),
            ));
        }
        Ok(Self(value.to_string()))
    }

    fn matches_id(&self, realm: &Realm) -> bool {
        self.0
            .trim_start_matches('#')
            .parse::<i64>()
            .map(|id| id == realm.id)
            .unwrap_or(false)
    }

    fn matches_name(&self, realm: &Realm) -> bool {
        realm.name.to_lowercase() == self.0.to_lowercase()
    }

    /// Pick the realm this selector names. Id matches win over name matches.
    pub fn pick<'a>(&self, realms: &'a [Realm]) -> RealmResult<&'a Realm> {
        if let Some(realm) = realms.iter().find(|r| self.matches_id(r)) {
            return Ok(realm);
        }

        let named: Vec<&Realm> = realms.iter().filter(|r| self.matches_name(r)).collect();
        match named.as_slice() {
            [realm] => Ok(*realm),
            [] => Err(RealmError::Configuration(format!(
                "no realm matches `{}`; available: {}",
                self.0,
                labels(realms)
            ))),
            several => Err(RealmError::Configuration(format!(
                "`{}` matches {} realms ({}); select one by id",
                self.0,
                several.len(),
                several.iter().map(|r| r.label()).collect::<Vec<_>>().join(", ")
            ))),
        }
    }
}

/// Asks the operator to choose among several realms
pub trait RealmPrompt {
    /// Index into `realms` of the operator's choice
    fn choose(&self, realms: &[Realm]) -> RealmResult<usize>;
}

pub enum SelectionPolicy {
    /// Only proceed when the account has exactly one realm
    SingleOnly,
    Selector(RealmSelector),
    Prompt(Box<dyn RealmPrompt + Send + Sync>),
}

impl SelectionPolicy {
    /// A configured selector takes precedence over prompting
    pub fn resolve(
        selector: Option<&str>,
        prompt: Option<Box<dyn RealmPrompt + Send + Sync>>,
    ) -> RealmResult<Self> {
        match (selector, prompt) {
            (Some(s), _) => Ok(SelectionPolicy::Selector(RealmSelector::parse(s)?)),
            (None, Some(p)) => Ok(SelectionPolicy::Prompt(p)),
            (None, None) => Ok(SelectionPolicy::SingleOnly),
        }
    }
}

impl std::fmt::Debug for SelectionPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SelectionPolicy::SingleOnly => write!(f, "SingleOnly"),
            SelectionPolicy::Selector(s) => f.debug_tuple("Selector").field(s).finish(),
            SelectionPolicy::Prompt(_) => write!(f, "Prompt"),
        }
    }
}

fn labels(realms: &[Realm]) -> String {
    realms.iter().map(|r| r.label()).collect::<Vec<_>>().join(", ")
}

pub fn select_realm(realms: &[Realm], policy: &SelectionPolicy) -> RealmResult<Realm> {
    match (realms, policy) {
        ([], _) => Err(RealmError::Service("account has no realms".to_string())),
        (_, SelectionPolicy::Selector(selector)) => selector.pick(realms).cloned(),
        ([only], _) => Ok(only.clone()),
        (_, SelectionPolicy::Prompt(prompt)) => {
            let index = prompt.choose(realms)?;
            realms.get(index).cloned().ok_or_else(|| {
                RealmError::Configuration(format!("realm choice {} is out of range", index))
            })
        }
        (_, SelectionPolicy::SingleOnly) => Err(RealmError::AmbiguousRealm {
            available: realms.iter().map(|r| r.label()).collect(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn realms() -> Vec<Realm> {
        vec![Realm::new(101, "MyWorld"), Realm::new(202, "Creative")]
    }

    struct FixedPrompt(usize);

    impl RealmPrompt for FixedPrompt {
        fn choose(&self, _realms: &[Realm]) -> RealmResult<usize> {
            Ok(self.0)
        }
    }

    #[test]
    fn test_single_realm_selected_automatically() {
        let only = vec![Realm::new(1, "MyWorld")];
        let picked = select_realm(&only, &SelectionPolicy::SingleOnly).unwrap();
        assert_eq!(picked.name, "MyWorld");
    }

    #[test]
    fn test_single_realm_selection_is_deterministic() {
        let only = vec![Realm::new(1, "MyWorld")];
        for _ in 0..5 {
            assert_eq!(select_realm(&only, &SelectionPolicy::SingleOnly).unwrap().id, 1);
        }
    }

    #[test]
    fn test_multiple_realms_without_selector_is_ambiguous() {
        let err = select_realm(&realms(), &SelectionPolicy::SingleOnly).unwrap_err();
        assert!(matches!(
            err,
            RealmError::AmbiguousRealm { ref available } if available.len() == 2
        ));
    }

    #[test]
    fn test_empty_list_is_service_error() {
        assert!(matches!(
            select_realm(&[], &SelectionPolicy::SingleOnly),
            Err(RealmError::Service(_))
        ));
    }

    #[test]
    fn test_selector_by_name_case_insensitive() {
        let policy = SelectionPolicy::resolve(Some("creative"), None).unwrap();
        assert_eq!(select_realm(&realms(), &policy).unwrap().id, 202);
    }

    #[test]
    fn test_selector_by_id() {
        let policy = SelectionPolicy::resolve(Some("101"), None).unwrap();
        assert_eq!(select_realm(&realms(), &policy).unwrap().name, "MyWorld");

        let policy = SelectionPolicy::resolve(Some("#202"), None).unwrap();
        assert_eq!(select_realm(&realms(), &policy).unwrap().name, "Creative");
    }

    #[test]
    fn test_selector_without_match_lists_available() {
        let policy = SelectionPolicy::resolve(Some("Survival"), None).unwrap();
        let err = select_realm(&realms(), &policy).unwrap_err();
        assert!(matches!(err, RealmError::Configuration(ref m) if m.contains("MyWorld (#101)")));
    }

    #[test]
    fn test_selector_must_match_even_with_single_realm() {
        let only = vec![Realm::new(1, "MyWorld")];
        let policy = SelectionPolicy::resolve(Some("Other"), None).unwrap();
        assert!(select_realm(&only, &policy).is_err());
    }

    #[test]
    fn test_duplicate_names_require_id() {
        let dupes = vec![Realm::new(1, "World"), Realm::new(2, "world")];
        let policy = SelectionPolicy::resolve(Some("World"), None).unwrap();
        assert!(matches!(
            select_realm(&dupes, &policy),
            Err(RealmError::Configuration(ref m)) if m.contains("select one by id")
        ));
    }

    #[test]
    fn test_prompt_used_for_multiple_realms() {
        let policy = SelectionPolicy::resolve(None, Some(Box::new(FixedPrompt(1)))).unwrap();
        assert_eq!(select_realm(&realms(), &policy).unwrap().id, 202);
    }

    #[test]
    fn test_prompt_out_of_range() {
        let policy = SelectionPolicy::resolve(None, Some(Box::new(FixedPrompt(9)))).unwrap();
        assert!(matches!(
            select_realm(&realms(), &policy),
            Err(RealmError::Configuration(_))
        ));
    }

    #[test]
    fn test_empty_selector_rejected() {
        assert!(SelectionPolicy::resolve(Some("  "), None).is_err());
    }
}
