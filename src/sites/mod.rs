use crate::locators::{FieldExtractor, SelectorCascade};
use crate::session::ExtractionPlan;

use self::bumeran::Bumeran;

mod bumeran;


pub(crate) const DEFAULT_SITES: [&str; 1] = [Bumeran::NAME];


/// Selector knowledge about one listing site.
///
/// Cascades are ordered from the most specific selector to the most generic one. Class
/// names on these sites are generated and change without notice, so every cascade should
/// end with something structural.
pub(crate) trait SiteProfile {
    const NAME: &'static str;

    fn card_cascade() -> SelectorCascade;

    fn pagination_cascade() -> SelectorCascade;

    fn field_extractor() -> FieldExtractor;

    fn plan() -> ExtractionPlan {
        ExtractionPlan {
            cards: Self::card_cascade(),
            pagination: Self::pagination_cascade(),
            fields: Self::field_extractor()
        }
    }
}


/// Returns the plan of the site with the given name, if it is known
pub(crate) fn plan_for(site: &str) -> Option<ExtractionPlan> {
    match site {
        name if name == Bumeran::NAME => Some(Bumeran::plan()),
        _ => None
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_default_site_has_a_plan() {
        for site in DEFAULT_SITES {
            let plan = plan_for(site).unwrap();
            assert!(!plan.cards.is_empty());
            assert!(!plan.pagination.is_empty());
        }
        assert!(plan_for("computrabajo").is_none());
    }
}
