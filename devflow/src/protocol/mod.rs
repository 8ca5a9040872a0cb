//! Structured output protocol parsing.
//!
//! Agents emit free-form text with delimited blocks describing the artifacts
//! they produced and the issues they found. Parsing is pure and total over
//! any input: malformed blocks are dropped, never escalated, so one bad
//! block cannot lose the well-formed blocks around it.
//!
//! ```text
//! ---ARTIFACT_START---
//! Type: requirements_doc
//! Name: checkout-requirements
//! Description: What the checkout flow must do
//! Content:
//! The checkout flow shall...
//! ---ARTIFACT_END---
//! ```

use regex::Regex;
use tracing::debug;
use uuid::Uuid;

use crate::core::{
    AgentRole, Artifact, ArtifactType, Issue, IssueSeverity, IssueType, PipelineStage,
};

const ARTIFACT_START: &str = "---ARTIFACT_START---";
const ARTIFACT_END: &str = "---ARTIFACT_END---";
const ISSUE_START: &str = "---ISSUE_START---";
const ISSUE_END: &str = "---ISSUE_END---";

/// A parsed artifact block, not yet attributed to a role or stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactDraft {
    /// Canonical artifact type after synonym normalization.
    pub artifact_type: ArtifactType,
    /// Artifact name.
    pub name: String,
    /// One-line description; empty when the block omitted it.
    pub description: String,
    /// Multi-line content; empty when the block omitted it.
    pub content: String,
}

impl ArtifactDraft {
    /// Materializes the draft into an artifact credited to `created_by`.
    #[must_use]
    pub fn into_artifact(self, created_by: AgentRole) -> Artifact {
        Artifact::new(self.artifact_type, self.name, created_by, self.content)
            .with_description(self.description)
    }
}

/// A parsed issue block, not yet attributed to a feature or stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueDraft {
    /// Canonical issue type after synonym normalization.
    pub issue_type: IssueType,
    /// Severity; defaults to `Medium` when absent or unrecognized.
    pub severity: IssueSeverity,
    /// Issue title.
    pub title: String,
    /// Longer description; empty when the block omitted it.
    pub description: String,
}

impl IssueDraft {
    /// Materializes the draft into an issue against the given feature.
    #[must_use]
    pub fn into_issue(
        self,
        feature_id: Uuid,
        reported_by: AgentRole,
        stage: PipelineStage,
    ) -> Issue {
        Issue::new(
            feature_id,
            self.issue_type,
            self.severity,
            self.title,
            reported_by,
            stage,
        )
        .with_description(self.description)
    }
}

/// Everything extracted from one raw agent output.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedOutput {
    /// Artifact drafts in the order their blocks appeared.
    pub artifacts: Vec<ArtifactDraft>,
    /// Issue drafts in the order their blocks appeared.
    pub issues: Vec<IssueDraft>,
}

/// Normalizes a raw type string for synonym lookup: lower-cased, with
/// `-`/`_`/space runs collapsed to single underscores.
fn normalize_type_key(raw: &str) -> String {
    raw.to_ascii_lowercase()
        .split(|c: char| c == '-' || c == '_' || c.is_whitespace())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

/// Maps the many human phrasings of an artifact type onto the canonical one.
fn lookup_artifact_type(raw: &str) -> Option<ArtifactType> {
    match normalize_type_key(raw).as_str() {
        "requirements" | "requirements_doc" | "requirements_document" | "requirement_doc" => {
            Some(ArtifactType::RequirementsDoc)
        }
        "user_stories" | "user_story" | "stories" => Some(ArtifactType::UserStories),
        "architecture" | "architecture_doc" | "architecture_document" | "design_doc"
        | "system_design" => Some(ArtifactType::ArchitectureDoc),
        "tech_spec" | "technical_spec" | "technical_specification" => Some(ArtifactType::TechSpec),
        "implementation_plan" | "impl_plan" | "work_plan" => Some(ArtifactType::ImplementationPlan),
        "source_code" | "code" | "source" => Some(ArtifactType::SourceCode),
        "test_plan" => Some(ArtifactType::TestPlan),
        "test_report" | "test_results" | "test_result" => Some(ArtifactType::TestReport),
        "review_report" | "code_review" | "review" => Some(ArtifactType::ReviewReport),
        "security_report" | "security_review" | "security_audit" => {
            Some(ArtifactType::SecurityReport)
        }
        "user_docs" | "user_documentation" | "documentation" | "docs" => {
            Some(ArtifactType::UserDocs)
        }
        "api_docs" | "api_documentation" | "api_reference" => Some(ArtifactType::ApiDocs),
        "deployment_config" | "deploy_config" | "deployment_configuration" => {
            Some(ArtifactType::DeploymentConfig)
        }
        "release_notes" | "changelog" => Some(ArtifactType::ReleaseNotes),
        _ => None,
    }
}

/// Maps issue type phrasings onto the canonical category; anything
/// unrecognized lands in `Other`.
fn lookup_issue_type(raw: &str) -> IssueType {
    match normalize_type_key(raw).as_str() {
        "bug" | "defect" | "error" => IssueType::Bug,
        "design_flaw" | "design" | "architecture" => IssueType::DesignFlaw,
        "security" | "vulnerability" | "security_flaw" => IssueType::Security,
        "performance" | "perf" => IssueType::Performance,
        "documentation" | "docs" => IssueType::Documentation,
        "test_gap" | "missing_tests" | "test_coverage" => IssueType::TestGap,
        _ => IssueType::Other,
    }
}

/// Maps a severity string onto the five-level scale, defaulting to `Medium`
/// when absent or unrecognized.
fn lookup_severity(raw: Option<&str>) -> IssueSeverity {
    raw.and_then(|s| s.parse().ok()).unwrap_or_default()
}

#[derive(Debug, Default)]
struct BlockFields {
    type_field: Option<String>,
    name: Option<String>,
    title: Option<String>,
    severity: Option<String>,
    description: Option<String>,
    content: Option<String>,
}

/// Parser for the delimited artifact/issue block grammar.
///
/// Holds only compiled regexes; `parse` is pure and idempotent.
#[derive(Debug)]
pub struct OutputProtocolParser {
    field_re: Regex,
}

impl OutputProtocolParser {
    /// Creates a parser.
    #[must_use]
    pub fn new() -> Self {
        Self {
            // Labeled single-line fields, tolerant of surrounding whitespace.
            #[allow(clippy::expect_used)]
            field_re: Regex::new(r"^\s*(Type|Name|Title|Severity|Description|Content)\s*:\s*(.*?)\s*$")
                .expect("static field regex"),
        }
    }

    /// Extracts every well-formed artifact and issue block from `text`.
    ///
    /// Never fails; worst case the result is empty.
    #[must_use]
    pub fn parse(&self, text: &str) -> ParsedOutput {
        let mut output = ParsedOutput::default();
        let lines: Vec<&str> = text.lines().collect();
        let mut idx = 0;

        while idx < lines.len() {
            match lines[idx].trim() {
                ARTIFACT_START => {
                    let (fields, next) = self.collect_block(&lines, idx + 1, ARTIFACT_END);
                    idx = next;
                    if let Some(draft) = Self::artifact_from_fields(fields) {
                        output.artifacts.push(draft);
                    }
                }
                ISSUE_START => {
                    let (fields, next) = self.collect_block(&lines, idx + 1, ISSUE_END);
                    idx = next;
                    if let Some(draft) = Self::issue_from_fields(fields) {
                        output.issues.push(draft);
                    }
                }
                _ => idx += 1,
            }
        }

        output
    }

    /// Collects labeled fields between `start` and the end marker.
    ///
    /// Returns the fields and the index just past the end marker (or past
    /// the final line for an unterminated block, which yields whatever
    /// fields were seen and is then dropped by the mandatory-field check if
    /// incomplete).
    fn collect_block(&self, lines: &[&str], start: usize, end_marker: &str) -> (BlockFields, usize) {
        let mut fields = BlockFields::default();
        let mut idx = start;

        while idx < lines.len() {
            let trimmed = lines[idx].trim();
            if trimmed == end_marker {
                return (fields, idx + 1);
            }

            if let Some(caps) = self.field_re.captures(lines[idx]) {
                let label = &caps[1];
                let value = caps[2].to_string();
                if label == "Content" && fields.content.is_none() {
                    // Content runs from here to the end of the block.
                    let mut body: Vec<String> = Vec::new();
                    if !value.is_empty() {
                        body.push(value);
                    }
                    idx += 1;
                    while idx < lines.len() && lines[idx].trim() != end_marker {
                        body.push(lines[idx].to_string());
                        idx += 1;
                    }
                    fields.content = Some(body.join("\n"));
                    continue;
                }

                // First match wins for single-line fields.
                let slot = match label {
                    "Type" => &mut fields.type_field,
                    "Name" => &mut fields.name,
                    "Title" => &mut fields.title,
                    "Severity" => &mut fields.severity,
                    "Description" => &mut fields.description,
                    _ => {
                        idx += 1;
                        continue;
                    }
                };
                if slot.is_none() {
                    *slot = Some(value);
                }
            }
            idx += 1;
        }

        (fields, idx)
    }

    fn artifact_from_fields(fields: BlockFields) -> Option<ArtifactDraft> {
        let raw_type = fields.type_field?;
        let name = fields.name.filter(|n| !n.is_empty())?;
        let Some(artifact_type) = lookup_artifact_type(&raw_type) else {
            debug!(raw_type = %raw_type, "Dropping artifact block with unrecognized type");
            return None;
        };

        Some(ArtifactDraft {
            artifact_type,
            name,
            description: fields.description.unwrap_or_default(),
            content: fields.content.unwrap_or_default(),
        })
    }

    fn issue_from_fields(fields: BlockFields) -> Option<IssueDraft> {
        let raw_type = fields.type_field?;
        let title = fields.title.filter(|t| !t.is_empty())?;

        Some(IssueDraft {
            issue_type: lookup_issue_type(&raw_type),
            severity: lookup_severity(fields.severity.as_deref()),
            title,
            description: fields.description.unwrap_or_default(),
        })
    }
}

impl Default for OutputProtocolParser {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parser() -> OutputProtocolParser {
        OutputProtocolParser::new()
    }

    const WELL_FORMED: &str = "\
Some agent chatter before the blocks.

---ARTIFACT_START---
Type: requirements_doc
Name: checkout-requirements
Description: What the checkout flow must do
Content:
The checkout flow shall accept cards.
It shall also accept wallets.
---ARTIFACT_END---

---ISSUE_START---
Type: security
Severity: high
Title: Card numbers logged in plain text
Description: The payment logger does not mask PANs.
---ISSUE_END---

Closing chatter.";

    #[test]
    fn test_parses_artifact_and_issue_blocks() {
        let parsed = parser().parse(WELL_FORMED);

        assert_eq!(parsed.artifacts.len(), 1);
        let artifact = &parsed.artifacts[0];
        assert_eq!(artifact.artifact_type, ArtifactType::RequirementsDoc);
        assert_eq!(artifact.name, "checkout-requirements");
        assert_eq!(
            artifact.content,
            "The checkout flow shall accept cards.\nIt shall also accept wallets."
        );

        assert_eq!(parsed.issues.len(), 1);
        let issue = &parsed.issues[0];
        assert_eq!(issue.issue_type, IssueType::Security);
        assert_eq!(issue.severity, IssueSeverity::High);
        assert_eq!(issue.title, "Card numbers logged in plain text");
    }

    #[test]
    fn test_parse_is_idempotent() {
        let p = parser();
        let first = p.parse(WELL_FORMED);
        let second = p.parse(WELL_FORMED);
        assert_eq!(first, second);
    }

    #[test]
    fn test_block_missing_name_is_dropped_neighbors_survive() {
        let text = "\
---ARTIFACT_START---
Type: requirements_doc
Name: first
Content:
a
---ARTIFACT_END---
---ARTIFACT_START---
Type: requirements_doc
Content:
no name here
---ARTIFACT_END---
---ARTIFACT_START---
Type: user_stories
Name: third
Content:
c
---ARTIFACT_END---";

        let parsed = parser().parse(text);
        assert_eq!(parsed.artifacts.len(), 2);
        assert_eq!(parsed.artifacts[0].name, "first");
        assert_eq!(parsed.artifacts[1].name, "third");
    }

    #[test]
    fn test_unrecognized_artifact_type_dropped_parsing_continues() {
        let text = "\
---ARTIFACT_START---
Type: napkin_sketch
Name: doodle
---ARTIFACT_END---
---ARTIFACT_START---
Type: Requirements Document
Name: reqs
---ARTIFACT_END---";

        let parsed = parser().parse(text);
        assert_eq!(parsed.artifacts.len(), 1);
        assert_eq!(parsed.artifacts[0].artifact_type, ArtifactType::RequirementsDoc);
    }

    #[test]
    fn test_type_synonym_normalization() {
        for phrasing in ["requirements", "Requirements Doc", "REQUIREMENTS_DOCUMENT", "requirements-doc"] {
            let text = format!(
                "---ARTIFACT_START---\nType: {phrasing}\nName: reqs\n---ARTIFACT_END---"
            );
            let parsed = parser().parse(&text);
            assert_eq!(parsed.artifacts.len(), 1, "phrasing: {phrasing}");
            assert_eq!(parsed.artifacts[0].artifact_type, ArtifactType::RequirementsDoc);
        }
    }

    #[test]
    fn test_severity_defaults_to_medium() {
        let text = "\
---ISSUE_START---
Type: bug
Title: no severity given
---ISSUE_END---
---ISSUE_START---
Type: bug
Severity: apocalyptic
Title: made-up severity
---ISSUE_END---";

        let parsed = parser().parse(text);
        assert_eq!(parsed.issues.len(), 2);
        assert_eq!(parsed.issues[0].severity, IssueSeverity::Medium);
        assert_eq!(parsed.issues[1].severity, IssueSeverity::Medium);
    }

    #[test]
    fn test_unknown_issue_type_maps_to_other() {
        let text = "\
---ISSUE_START---
Type: vibes
Title: something feels off
---ISSUE_END---";
        let parsed = parser().parse(text);
        assert_eq!(parsed.issues[0].issue_type, IssueType::Other);
    }

    #[test]
    fn test_first_match_wins_for_single_line_fields() {
        let text = "\
---ARTIFACT_START---
Type: source_code
Name: first-name
Name: second-name
Content:
x
---ARTIFACT_END---";
        let parsed = parser().parse(text);
        assert_eq!(parsed.artifacts[0].name, "first-name");
    }

    #[test]
    fn test_content_preserves_field_looking_lines() {
        let text = "\
---ARTIFACT_START---
Type: source_code
Name: config
Content:
Name: this is content, not a field
Type: so is this
---ARTIFACT_END---";
        let parsed = parser().parse(text);
        assert_eq!(parsed.artifacts[0].name, "config");
        assert!(parsed.artifacts[0]
            .content
            .contains("Name: this is content, not a field"));
    }

    #[test]
    fn test_crlf_and_indented_markers_tolerated() {
        let text = "---ARTIFACT_START---\r\nType: source_code\r\nName: main\r\n  ---ARTIFACT_END---\r\n";
        let parsed = parser().parse(text);
        assert_eq!(parsed.artifacts.len(), 1);
    }

    #[test]
    fn test_unterminated_block_keeps_complete_fields() {
        let text = "\
---ARTIFACT_START---
Type: source_code
Name: dangling";
        let parsed = parser().parse(text);
        // Truncated input, but Type and Name were both seen.
        assert_eq!(parsed.artifacts.len(), 1);

        let empty = parser().parse("---ARTIFACT_START---\nType: source_code");
        assert!(empty.artifacts.is_empty());
    }

    #[test]
    fn test_empty_and_garbage_input() {
        assert_eq!(parser().parse(""), ParsedOutput::default());
        assert_eq!(parser().parse("no blocks at all"), ParsedOutput::default());
    }

    #[test]
    fn test_draft_materialization() {
        let parsed = parser().parse(WELL_FORMED);

        let artifact = parsed.artifacts[0]
            .clone()
            .into_artifact(AgentRole::ProductManager);
        assert_eq!(artifact.created_by, AgentRole::ProductManager);
        assert_eq!(artifact.version, 1);

        let feature_id = crate::utils::generate_uuid();
        let issue = parsed.issues[0].clone().into_issue(
            feature_id,
            AgentRole::SecurityEngineer,
            PipelineStage::CodeReview,
        );
        assert_eq!(issue.feature_id, feature_id);
        assert_eq!(issue.stage, PipelineStage::CodeReview);
    }
}
