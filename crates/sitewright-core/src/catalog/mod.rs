//! Niche and design-system catalogs
//!
//! Pure lookup data consumed by the plan generator. Unresolved ids are
//! configuration errors raised before any step is built.

use std::sync::LazyLock;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Business niche profile driving content decisions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NicheProfile {
    pub id: String,
    pub name: String,
    /// Writing tone for generated copy
    pub tone: String,
    /// Content sections a page in this niche typically carries
    pub sections: Vec<String>,
    /// Primary conversion action for the site
    pub call_to_action: String,
}

/// Design-system profile driving visual decisions
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignSystemProfile {
    pub id: String,
    pub name: String,
    pub heading_font: String,
    pub body_font: String,
    /// Hex colors: primary, accent, background
    pub palette: Vec<String>,
    /// Component shape language, e.g. "rounded-2xl, soft shadows"
    pub component_style: String,
}

fn profile(
    id: &str,
    name: &str,
    tone: &str,
    sections: &[&str],
    call_to_action: &str,
) -> NicheProfile {
    NicheProfile {
        id: id.to_string(),
        name: name.to_string(),
        tone: tone.to_string(),
        sections: sections.iter().map(|s| s.to_string()).collect(),
        call_to_action: call_to_action.to_string(),
    }
}

static NICHES: LazyLock<Vec<NicheProfile>> = LazyLock::new(|| {
    vec![
        profile(
            "restaurant",
            "Restaurant & Cafe",
            "warm and inviting",
            &["hero", "menu-highlights", "story", "gallery", "hours-location"],
            "Reserve a table",
        ),
        profile(
            "law-firm",
            "Law Firm",
            "authoritative and reassuring",
            &["hero", "practice-areas", "attorneys", "results", "consultation"],
            "Book a consultation",
        ),
        profile(
            "fitness",
            "Fitness Studio",
            "energetic and motivating",
            &["hero", "programs", "trainers", "pricing", "testimonials"],
            "Start a free trial",
        ),
        profile(
            "saas",
            "SaaS Product",
            "clear and confident",
            &["hero", "features", "how-it-works", "pricing", "faq"],
            "Start free trial",
        ),
        profile(
            "portfolio",
            "Personal Portfolio",
            "personal and direct",
            &["hero", "selected-work", "about", "services", "contact"],
            "Get in touch",
        ),
    ]
});

static DESIGN_SYSTEMS: LazyLock<Vec<DesignSystemProfile>> = LazyLock::new(|| {
    vec![
        DesignSystemProfile {
            id: "modern-minimal".to_string(),
            name: "Modern Minimal".to_string(),
            heading_font: "Inter".to_string(),
            body_font: "Inter".to_string(),
            palette: vec!["#0f172a".into(), "#3b82f6".into(), "#f8fafc".into()],
            component_style: "rounded-xl, generous whitespace, hairline borders".to_string(),
        },
        DesignSystemProfile {
            id: "bold-editorial".to_string(),
            name: "Bold Editorial".to_string(),
            heading_font: "Playfair Display".to_string(),
            body_font: "Source Sans 3".to_string(),
            palette: vec!["#111111".into(), "#e11d48".into(), "#fffbf5".into()],
            component_style: "sharp corners, oversized type, strong rules".to_string(),
        },
        DesignSystemProfile {
            id: "classic-elegant".to_string(),
            name: "Classic Elegant".to_string(),
            heading_font: "Cormorant Garamond".to_string(),
            body_font: "Lato".to_string(),
            palette: vec!["#1c1917".into(), "#a16207".into(), "#faf7f2".into()],
            component_style: "subtle serif details, muted gold accents".to_string(),
        },
        DesignSystemProfile {
            id: "playful".to_string(),
            name: "Playful".to_string(),
            heading_font: "Fredoka".to_string(),
            body_font: "Nunito".to_string(),
            palette: vec!["#312e81".into(), "#f59e0b".into(), "#fef3c7".into()],
            component_style: "rounded-2xl, soft shadows, blob shapes".to_string(),
        },
    ]
});

/// All built-in niches
pub fn niches() -> &'static [NicheProfile] {
    &NICHES
}

/// All built-in design systems
pub fn design_systems() -> &'static [DesignSystemProfile] {
    &DESIGN_SYSTEMS
}

/// Resolve a niche id, failing fast on unknown ids
pub fn resolve_niche(id: &str) -> Result<&'static NicheProfile> {
    NICHES
        .iter()
        .find(|n| n.id == id)
        .ok_or_else(|| Error::UnknownNiche(id.to_string()))
}

/// Resolve a design-system id, failing fast on unknown ids
pub fn resolve_design_system(id: &str) -> Result<&'static DesignSystemProfile> {
    DESIGN_SYSTEMS
        .iter()
        .find(|d| d.id == id)
        .ok_or_else(|| Error::UnknownDesignSystem(id.to_string()))
}
