//! Phase builders
//!
//! Each builder contributes one contiguous block of steps for a single
//! phase. Ids are assigned by the shared [`PlanAccumulator`] in push order,
//! so a builder can only ever reference ids from earlier phases in a step's
//! dependencies.

use crate::catalog::{DesignSystemProfile, NicheProfile};

use super::types::{BuildPhase, BuildTask, RetryStrategy, Step};

const SCAFFOLD_TOKENS: u32 = 3000;
const DESIGN_TOKENS_TOKENS: u32 = 1500;
const LAYOUT_TOKENS: u32 = 2500;
const PAGE_TOKENS: u32 = 2000;
const CONTENT_TOKENS: u32 = 3500;
const STYLING_TOKENS: u32 = 2500;
const INTEGRATION_TOKENS: u32 = 2500;
const REVIEW_TOKENS: u32 = 2000;
const EXPORT_TOKENS: u32 = 1500;

/// A step without an id yet; the accumulator assigns ids in push order
#[derive(Debug, Clone)]
pub(crate) struct StepDraft {
    pub phase: BuildPhase,
    pub name: String,
    pub description: String,
    pub prompt: String,
    pub estimated_tokens: u32,
    pub dependencies: Vec<u32>,
    pub can_parallelize: bool,
    pub outputs: Vec<String>,
    pub validation_checks: Vec<String>,
    pub retry_strategy: RetryStrategy,
    pub max_retries: u32,
}

/// Assigns contiguous ids starting at 1 and collects the step sequence
#[derive(Debug, Default)]
pub(crate) struct PlanAccumulator {
    steps: Vec<Step>,
}

impl PlanAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a draft, returning the id it was assigned
    pub fn push(&mut self, draft: StepDraft) -> u32 {
        let id = self.steps.len() as u32 + 1;
        debug_assert!(
            draft.dependencies.iter().all(|&dep| dep >= 1 && dep < id),
            "step {} references a dependency that does not precede it",
            id
        );
        self.steps.push(Step {
            id,
            phase: draft.phase,
            name: draft.name,
            description: draft.description,
            prompt: draft.prompt,
            estimated_tokens: draft.estimated_tokens,
            dependencies: draft.dependencies,
            can_parallelize: draft.can_parallelize,
            outputs: draft.outputs,
            validation_checks: draft.validation_checks,
            retry_strategy: draft.retry_strategy,
            max_retries: draft.max_retries,
        });
        id
    }

    pub fn into_steps(self) -> Vec<Step> {
        self.steps
    }
}

/// Ids produced by the foundation phase that later phases depend on
#[derive(Debug, Clone, Copy)]
pub(crate) struct FoundationSteps {
    pub scaffold: u32,
    pub layout: u32,
}

/// One structure step per requested page
#[derive(Debug, Clone)]
pub(crate) struct PageStep {
    pub page: String,
    pub id: u32,
}

/// Turn a page or integration name into a filesystem slug
fn slugify(name: &str) -> String {
    name.trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '-' })
        .collect::<String>()
        .split('-')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Route path for a page; the home page sits at the app root
fn page_path(page: &str) -> String {
    let slug = slugify(page);
    if slug == "home" {
        "src/app/page.tsx".to_string()
    } else {
        format!("src/app/{}/page.tsx", slug)
    }
}

/// Foundation: scaffold, design tokens, layout shell. Always three steps.
pub(crate) fn build_foundation(
    task: &BuildTask,
    niche: &NicheProfile,
    design: &DesignSystemProfile,
    acc: &mut PlanAccumulator,
) -> FoundationSteps {
    let scaffold = acc.push(StepDraft {
        phase: BuildPhase::Foundation,
        name: "Scaffold project".to_string(),
        description: format!("Create the project skeleton for a {} site", niche.name),
        prompt: format!(
            "Scaffold a production-ready Next.js project for this business: {}.\n\
             Use TypeScript and the app router. Create package.json, \
             next.config.js, tsconfig.json, and an empty src/app tree.",
            task.business_description
        ),
        estimated_tokens: SCAFFOLD_TOKENS,
        dependencies: vec![],
        can_parallelize: false,
        outputs: vec![
            "package.json".to_string(),
            "next.config.js".to_string(),
            "tsconfig.json".to_string(),
        ],
        validation_checks: vec![
            "package.json declares next, react, and typescript".to_string(),
            "project builds with no pages yet".to_string(),
        ],
        retry_strategy: RetryStrategy::Escalate,
        max_retries: 3,
    });

    let tokens = acc.push(StepDraft {
        phase: BuildPhase::Foundation,
        name: "Design tokens".to_string(),
        description: format!("Set up the {} design tokens", design.name),
        prompt: format!(
            "Define CSS design tokens for the '{}' design system: heading font {}, \
             body font {}, palette {}, component style: {}. \
             Write them to src/styles/tokens.css as custom properties.",
            design.name,
            design.heading_font,
            design.body_font,
            design.palette.join(", "),
            design.component_style
        ),
        estimated_tokens: DESIGN_TOKENS_TOKENS,
        dependencies: vec![scaffold],
        can_parallelize: false,
        outputs: vec!["src/styles/tokens.css".to_string()],
        validation_checks: vec!["every palette color appears as a custom property".to_string()],
        retry_strategy: RetryStrategy::Escalate,
        max_retries: 2,
    });

    let layout = acc.push(StepDraft {
        phase: BuildPhase::Foundation,
        name: "Layout shell".to_string(),
        description: "Shared header, footer, and root layout".to_string(),
        prompt: format!(
            "Build the shared layout shell: a site header with navigation for the pages {}, \
             a footer with the call to action \"{}\", and the root layout wiring in \
             src/styles/tokens.css. Tone of any microcopy: {}.",
            task.pages.join(", "),
            niche.call_to_action,
            niche.tone
        ),
        estimated_tokens: LAYOUT_TOKENS,
        dependencies: vec![scaffold, tokens],
        can_parallelize: false,
        outputs: vec![
            "src/app/layout.tsx".to_string(),
            "src/components/SiteHeader.tsx".to_string(),
            "src/components/SiteFooter.tsx".to_string(),
        ],
        validation_checks: vec![
            "navigation links every requested page".to_string(),
            "footer carries the primary call to action".to_string(),
        ],
        retry_strategy: RetryStrategy::Escalate,
        max_retries: 3,
    });

    FoundationSteps { scaffold, layout }
}

/// Structure: one page skeleton per requested page, in request order.
pub(crate) fn build_structure(
    task: &BuildTask,
    foundation: FoundationSteps,
    acc: &mut PlanAccumulator,
) -> Vec<PageStep> {
    task.pages
        .iter()
        .map(|page| {
            let path = page_path(page);
            let id = acc.push(StepDraft {
                phase: BuildPhase::Structure,
                name: format!("Page skeleton: {}", page),
                description: format!("Route and empty section layout for the {} page", page),
                prompt: format!(
                    "Create the '{}' page at {} using the shared layout shell. \
                     Lay out empty, labeled section placeholders only; content comes later.",
                    page, path
                ),
                estimated_tokens: PAGE_TOKENS,
                dependencies: vec![foundation.layout],
                can_parallelize: false,
                outputs: vec![path],
                validation_checks: vec!["page renders inside the shared layout".to_string()],
                retry_strategy: RetryStrategy::Escalate,
                max_retries: 2,
            });
            PageStep {
                page: page.clone(),
                id,
            }
        })
        .collect()
}

/// Content: fill each page with niche-specific sections and copy.
pub(crate) fn build_content(
    task: &BuildTask,
    niche: &NicheProfile,
    pages: &[PageStep],
    acc: &mut PlanAccumulator,
) -> Vec<u32> {
    pages
        .iter()
        .map(|page| {
            let slug = slugify(&page.page);
            acc.push(StepDraft {
                phase: BuildPhase::Content,
                name: format!("Content: {}", page.page),
                description: format!("Sections and copy for the {} page", page.page),
                prompt: format!(
                    "Write the '{}' page content for this business: {}.\n\
                     Fill the placeholder sections using these niche sections where they \
                     apply: {}. Tone: {}. Primary call to action: \"{}\". \
                     Requested features to mention where relevant: {}.",
                    page.page,
                    task.business_description,
                    niche.sections.join(", "),
                    niche.tone,
                    niche.call_to_action,
                    if task.features.is_empty() {
                        "none".to_string()
                    } else {
                        task.features.join(", ")
                    }
                ),
                estimated_tokens: CONTENT_TOKENS,
                dependencies: vec![page.id],
                can_parallelize: true,
                outputs: vec![format!("src/content/{}.mdx", slug)],
                validation_checks: vec![
                    "copy matches the niche tone".to_string(),
                    "call to action appears above the fold".to_string(),
                ],
                retry_strategy: RetryStrategy::Escalate,
                max_retries: 3,
            })
        })
        .collect()
}

/// Styling: a responsive pass and a design-system polish pass.
pub(crate) fn build_styling(
    design: &DesignSystemProfile,
    content_steps: &[u32],
    acc: &mut PlanAccumulator,
) -> Vec<u32> {
    let responsive = acc.push(StepDraft {
        phase: BuildPhase::Styling,
        name: "Responsive pass".to_string(),
        description: "Mobile-first responsive behavior for every page".to_string(),
        prompt: "Audit every page at mobile, tablet, and desktop widths and add the \
                 responsive rules needed. Write shared breakpoint styles to \
                 src/styles/responsive.css."
            .to_string(),
        estimated_tokens: STYLING_TOKENS,
        dependencies: content_steps.to_vec(),
        can_parallelize: true,
        outputs: vec!["src/styles/responsive.css".to_string()],
        validation_checks: vec!["no horizontal overflow at 360px width".to_string()],
        retry_strategy: RetryStrategy::Skip,
        max_retries: 2,
    });

    let polish = acc.push(StepDraft {
        phase: BuildPhase::Styling,
        name: "Design-system polish".to_string(),
        description: format!("Apply {} polish across components", design.name),
        prompt: format!(
            "Sweep all components and align them with the '{}' design system: {}. \
             Fix spacing, type scale, and color usage against src/styles/tokens.css.",
            design.name, design.component_style
        ),
        estimated_tokens: STYLING_TOKENS,
        dependencies: content_steps.to_vec(),
        can_parallelize: true,
        outputs: vec!["src/styles/polish.css".to_string()],
        validation_checks: vec!["only token colors are used".to_string()],
        retry_strategy: RetryStrategy::Skip,
        max_retries: 2,
    });

    vec![responsive, polish]
}

/// Integration: one step per requested integration, in request order.
pub(crate) fn build_integration(
    task: &BuildTask,
    foundation: FoundationSteps,
    acc: &mut PlanAccumulator,
) -> Vec<u32> {
    task.integrations
        .iter()
        .map(|integration| {
            let slug = slugify(integration);
            acc.push(StepDraft {
                phase: BuildPhase::Integration,
                name: format!("Integration: {}", integration),
                description: format!("Wire up the {} integration", integration),
                prompt: format!(
                    "Add the '{}' integration. Keep third-party code isolated in \
                     src/integrations/{}.ts and wire it into the layout or the pages \
                     that need it.",
                    integration, slug
                ),
                estimated_tokens: INTEGRATION_TOKENS,
                dependencies: vec![foundation.layout],
                can_parallelize: false,
                outputs: vec![format!("src/integrations/{}.ts", slug)],
                validation_checks: vec!["integration degrades gracefully when offline".to_string()],
                retry_strategy: RetryStrategy::Skip,
                max_retries: 2,
            })
        })
        .collect()
}

/// Delivery: site-wide review, then export readiness. Always last, always two steps.
pub(crate) fn build_delivery(
    task: &BuildTask,
    styling_steps: &[u32],
    integration_steps: &[u32],
    acc: &mut PlanAccumulator,
) -> Vec<u32> {
    let mut review_deps: Vec<u32> = styling_steps.to_vec();
    review_deps.extend_from_slice(integration_steps);

    let review = acc.push(StepDraft {
        phase: BuildPhase::Delivery,
        name: "Site-wide review".to_string(),
        description: "Cross-page consistency and accessibility review".to_string(),
        prompt: format!(
            "Review the whole site for this business: {}.\n\
             Check cross-page consistency, link integrity, accessibility basics, and \
             that every requested page ({}) is reachable. Record findings and fixes \
             applied in REVIEW.md.",
            task.business_description,
            task.pages.join(", ")
        ),
        estimated_tokens: REVIEW_TOKENS,
        dependencies: review_deps,
        can_parallelize: false,
        outputs: vec!["REVIEW.md".to_string()],
        validation_checks: vec![
            "all internal links resolve".to_string(),
            "images carry alt text".to_string(),
        ],
        retry_strategy: RetryStrategy::Escalate,
        max_retries: 2,
    });

    let export = acc.push(StepDraft {
        phase: BuildPhase::Delivery,
        name: "Export readiness".to_string(),
        description: "Production build check and export manifest".to_string(),
        prompt: "Run a production build, fix anything blocking it, and write \
                 export-manifest.json listing every page and asset the deploy \
                 pipeline should pick up."
            .to_string(),
        estimated_tokens: EXPORT_TOKENS,
        dependencies: vec![review],
        can_parallelize: false,
        outputs: vec!["export-manifest.json".to_string()],
        validation_checks: vec!["production build succeeds".to_string()],
        retry_strategy: RetryStrategy::Escalate,
        max_retries: 2,
    });

    vec![review, export]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog;

    fn task() -> BuildTask {
        BuildTask::new("A bakery in Lisbon", "restaurant", "modern-minimal")
            .with_id("proj-test")
            .with_pages(vec!["home".into(), "menu".into(), "contact".into()])
            .with_integrations(vec!["contact form".into()])
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("Contact Form"), "contact-form");
        assert_eq!(slugify("  About Us  "), "about-us");
        assert_eq!(slugify("FAQ"), "faq");
        assert_eq!(slugify("a--b"), "a-b");
    }

    #[test]
    fn test_page_path_home_is_root() {
        assert_eq!(page_path("home"), "src/app/page.tsx");
        assert_eq!(page_path("menu"), "src/app/menu/page.tsx");
    }

    #[test]
    fn test_foundation_is_three_steps() {
        let task = task();
        let niche = catalog::resolve_niche("restaurant").unwrap();
        let design = catalog::resolve_design_system("modern-minimal").unwrap();

        let mut acc = PlanAccumulator::new();
        let foundation = build_foundation(&task, niche, design, &mut acc);
        let steps = acc.into_steps();

        assert_eq!(steps.len(), 3);
        assert_eq!(foundation.scaffold, 1);
        assert_eq!(foundation.layout, 3);
        assert!(steps.iter().all(|s| s.phase == BuildPhase::Foundation));
        assert!(steps.iter().all(|s| !s.can_parallelize));
    }

    #[test]
    fn test_structure_one_step_per_page() {
        let task = task();
        let niche = catalog::resolve_niche("restaurant").unwrap();
        let design = catalog::resolve_design_system("modern-minimal").unwrap();

        let mut acc = PlanAccumulator::new();
        let foundation = build_foundation(&task, niche, design, &mut acc);
        let pages = build_structure(&task, foundation, &mut acc);

        assert_eq!(pages.len(), 3);
        let steps = acc.into_steps();
        assert_eq!(steps[3].outputs, vec!["src/app/page.tsx"]);
        assert_eq!(steps[4].outputs, vec!["src/app/menu/page.tsx"]);
        assert!(steps[3..].iter().all(|s| s.dependencies == vec![foundation.layout]));
    }

    #[test]
    fn test_content_depends_on_matching_page() {
        let task = task();
        let niche = catalog::resolve_niche("restaurant").unwrap();
        let design = catalog::resolve_design_system("modern-minimal").unwrap();

        let mut acc = PlanAccumulator::new();
        let foundation = build_foundation(&task, niche, design, &mut acc);
        let pages = build_structure(&task, foundation, &mut acc);
        let content = build_content(&task, niche, &pages, &mut acc);

        let steps = acc.into_steps();
        for (page, content_id) in pages.iter().zip(&content) {
            let step = &steps[(*content_id - 1) as usize];
            assert_eq!(step.dependencies, vec![page.id]);
            assert!(step.can_parallelize);
            assert!(step.prompt.contains("A bakery in Lisbon"));
        }
    }

    #[test]
    fn test_builder_determinism() {
        let task = task();
        let niche = catalog::resolve_niche("restaurant").unwrap();
        let design = catalog::resolve_design_system("modern-minimal").unwrap();

        let run = || {
            let mut acc = PlanAccumulator::new();
            let foundation = build_foundation(&task, niche, design, &mut acc);
            let pages = build_structure(&task, foundation, &mut acc);
            let content = build_content(&task, niche, &pages, &mut acc);
            let styling = build_styling(design, &content, &mut acc);
            let integrations = build_integration(&task, foundation, &mut acc);
            build_delivery(&task, &styling, &integrations, &mut acc);
            acc.into_steps()
        };

        let first = run();
        let second = run();
        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            assert_eq!(a.id, b.id);
            assert_eq!(a.outputs, b.outputs);
            assert_eq!(a.dependencies, b.dependencies);
        }
    }

    #[test]
    fn test_delivery_export_follows_review() {
        let task = task();
        let niche = catalog::resolve_niche("restaurant").unwrap();
        let design = catalog::resolve_design_system("modern-minimal").unwrap();

        let mut acc = PlanAccumulator::new();
        let foundation = build_foundation(&task, niche, design, &mut acc);
        let pages = build_structure(&task, foundation, &mut acc);
        let content = build_content(&task, niche, &pages, &mut acc);
        let styling = build_styling(design, &content, &mut acc);
        let integrations = build_integration(&task, foundation, &mut acc);
        let delivery = build_delivery(&task, &styling, &integrations, &mut acc);

        let steps = acc.into_steps();
        let export = &steps[(delivery[1] - 1) as usize];
        assert_eq!(export.dependencies, vec![delivery[0]]);
        assert_eq!(export.id as usize, steps.len());
    }
}
