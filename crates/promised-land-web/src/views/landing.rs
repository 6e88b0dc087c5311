//! Landing page hero section

use super::{Rendered, html};
use askama::Template;
use promised_land_admin::Notice;

/// One figure in the hero stats row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroStat {
    /// Large figure
    pub value: String,
    /// Caption under the figure
    pub label: String,
}

/// A call to action button
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallToAction {
    /// Button text
    pub label: String,
    /// Link target
    pub href: String,
}

/// A course on the decorative card
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeaturedCourse {
    /// Course name
    pub name: String,
    /// Length of the course
    pub duration: String,
}

/// Content of the landing page hero
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeroContent {
    /// Pill above the headline
    pub badge: String,
    /// Headline before the highlighted school name
    pub headline: String,
    /// Highlighted end of the headline
    pub highlight: String,
    /// Line under the headline
    pub tagline: String,
    /// Primary and secondary calls to action
    pub actions: [CallToAction; 2],
    /// Stats row
    pub stats: Vec<HeroStat>,
    /// Intake shown on the card
    pub intake: String,
    /// Courses listed on the card
    pub courses: Vec<FeaturedCourse>,
}

fn stat(value: &str, label: &str) -> HeroStat {
    HeroStat {
        value: value.to_string(),
        label: label.to_string(),
    }
}

fn course(name: &str, duration: &str) -> FeaturedCourse {
    FeaturedCourse {
        name: name.to_string(),
        duration: duration.to_string(),
    }
}

impl Default for HeroContent {
    fn default() -> Self {
        Self {
            badge: "Now Accepting Applications for January 2026".to_string(),
            headline: "Your Future Begins at".to_string(),
            highlight: "Promised Land".to_string(),
            tagline: "Equipping young people and professionals with practical, market-ready \
                      skills for a modern, competitive world."
                .to_string(),
            actions: [
                CallToAction {
                    label: "Apply Now".to_string(),
                    href: "/apply".to_string(),
                },
                CallToAction {
                    label: "Explore Programs".to_string(),
                    href: "/programs".to_string(),
                },
            ],
            stats: vec![
                stat("10", "Certificate Programs"),
                stat("Expert", "Instructors"),
                stat("100%", "Hands-on Learning"),
            ],
            intake: "January 2026".to_string(),
            courses: vec![
                course("Web Development", "6 months"),
                course("Digital Marketing", "4 months"),
                course("Entrepreneurship", "4 months"),
            ],
        }
    }
}

#[derive(Debug, Template)]
#[template(path = "landing.html")]
struct LandingPage<'a> {
    notice: Option<&'a Notice>,
    hero: &'a HeroContent,
}

/// Render the landing page
///
/// # Errors
///
/// Returns the template engine's error.
pub fn render(hero: &HeroContent) -> Rendered {
    html(&LandingPage { notice: None, hero })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use axum::response::Html;

    #[test]
    fn test_default_hero_renders_copy_and_links() {
        let Html(page) = render(&HeroContent::default()).unwrap();

        assert!(page.contains("Now Accepting Applications for January 2026"));
        assert!(page.contains("Your Future Begins at <span class=\"highlight\">Promised Land</span>"));
        assert!(page.contains(">Apply Now</a>"));
        assert!(page.contains(">Explore Programs</a>"));
        assert!(page.contains("<a href=\"/programs\">View All Programs</a>"));
        assert!(page.contains("Hands-on Learning"));
    }

    #[test]
    fn test_hero_copy_is_escaped() {
        let hero = HeroContent {
            badge: "<em>Open</em>".to_string(),
            ..HeroContent::default()
        };

        let Html(page) = render(&hero).unwrap();

        assert!(page.contains("&lt;em&gt;Open"));
        assert!(!page.contains("<em>Open"));
    }
}
