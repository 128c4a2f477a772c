use crate::locators::{Field, FieldExtractor, FieldRule, SelectorCascade, SelectorSpec};

use super::SiteProfile;


/// Bumeran and its regional variants, which render results with styled-components
pub(super) struct Bumeran;


impl SiteProfile for Bumeran {
    const NAME: &'static str = "bumeran";

    fn card_cascade() -> SelectorCascade {
        SelectorCascade::new(vec![
            SelectorSpec::css("div[class*='sc-kXoVnq']"),
            SelectorSpec::css("div[class*='aviso']"),
            SelectorSpec::css("div[class*='job-card']"),
            SelectorSpec::css("div[class*='vacancy']"),
            // Any generated container that holds a heading
            SelectorSpec::xpath("//div[contains(@class, 'sc-') and .//h2]")
        ])
    }

    fn pagination_cascade() -> SelectorCascade {
        SelectorCascade::new(vec![
            SelectorSpec::css("ul[class*='pagination'] li a"),
            SelectorSpec::css("nav[aria-label*='agin'] a"),
            SelectorSpec::css("a[class*='page-link']"),
            SelectorSpec::xpath("//a[contains(@href, 'page=')]")
        ])
    }

    fn field_extractor() -> FieldExtractor {
        let text = |patterns: &[&str]| -> Vec<FieldRule> {
            patterns.iter().map(|p| FieldRule::text(SelectorSpec::css(*p))).collect()
        };

        FieldExtractor::new()
            .with_rules(Field::Title, text(&["h2", "[class*='title']"]))
            .with_rules(Field::Company, text(&["h3[class*='sc-eLVolr']", "span[class*='sc-iEPtyo'] h3"]))
            .with_rules(Field::Location, text(&[
                "span[class*='sc-fPEBxH'] h3",
                "div[class*='sc-cBXKeB'] h3[class*='sc-hWkyhb']"
            ]))
            .with_rules(Field::Published, text(&["h3[class*='sc-iLQbDB']", "div[class*='sc-lmrgJh'] h3"]))
            .with_rules(Field::Url, vec![FieldRule::attribute(SelectorSpec::css("a"), "href")])
    }
}
