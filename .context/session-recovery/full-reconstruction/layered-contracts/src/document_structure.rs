//! Document structure building from per-line section headers.
//!
//! This module provides `DocumentStructureBuilder` which takes a `ContractDocument`
//! with `SectionHeader` attributes on individual lines and builds a hierarchical
//! `DocumentStructure` representing the document's outline.

use layered_nlp::x;

use crate::document::{ContractDocument, DocPosition, DocSpan, ProcessResult};
use crate::section_header::SectionHeader;

/// Hierarchical representation of document structure.
#[derive(Debug, Clone)]
pub struct DocumentStructure {
    /// Root-level sections (articles, top-level sections)
    pub sections: Vec<SectionNode>,
}

impl DocumentStructure {
    /// Create an empty structure.
    pub fn empty() -> Self {
        Self { sections: Vec::new() }
    }

    /// Get all sections flattened (depth-first traversal).
    pub fn flatten(&self) -> Vec<&SectionNode> {
        let mut result = Vec::new();
        for section in &self.sections {
            Self::flatten_node(section, &mut result);
        }
        result
    }

    fn flatten_node<'a>(node: &'a SectionNode, result: &mut Vec<&'a SectionNode>) {
        result.push(node);
        for child in &node.children {
            Self::flatten_node(child, result);
        }
    }

    /// Find a section by its canonical identifier.
    pub fn find_by_canonical(&self, canonical: &str) -> Option<&SectionNode> {
        self.flatten()
            .into_iter()
            .find(|node| node.header.identifier.canonical() == canonical)
    }

    /// Get total number of sections (including nested).
    pub fn total_sections(&self) -> usize {
        self.flatten().len()
    }
}

/// A node in the document structure tree.
#[derive(Debug, Clone)]
pub struct SectionNode {
    /// The section header information
    pub header: SectionHeader,
    /// Line number where this section starts
    pub start_line: usize,
    /// Line number where this section ends (exclusive of next section)
    pub end_line: Option<usize>,
    /// Document span covering the entire section
    pub content_span: DocSpan,
    /// Child sections (subsections)
    pub children: Vec<SectionNode>,
}

impl SectionNode {
    /// Get the section depth based on the identifier.
    pub fn depth(&self) -> u8 {
        self.header.identifier.depth()
    }
}

/// Builds document structure from per-line section headers.
pub struct DocumentStructureBuilder;

impl DocumentStructureBuilder {
    /// Process a document and build its hierarchical structure.
    ///
    /// Prerequisites:
    /// - The document must have been processed with `SectionHeaderResolver`
    ///   to add `SectionHeader` attributes to lines containing headers.
    pub fn build(doc: &ContractDocument) -> ProcessResult<DocumentStructure> {
        let errors = Vec::new();
        let mut warnings = Vec::new();

        // Collect all section headers with their line numbers.
        // Only include headers that start at the beginning of a line (token 0 or 1)
        // to avoid false positives like "comply with Section 3.1" being treated as a header.
        let mut headers: Vec<(usize, SectionHeader)> = Vec::new();

        for (line_idx, line) in doc.lines_enumerated() {
            for found in line.find(&x::attr::<SectionHeader>()) {
                let (start, _end) = found.range();
                // Only consider headers that start at the beginning of the line
                if start > 1 {
                    continue;
                }
                // found.attr() returns &&SectionHeader, so we need (*found.attr()).clone()
                headers.push((line_idx, (*found.attr()).clone()));
            }
        }

        if headers.is_empty() {
            warnings.push("No section headers found in document".to_string());
            return ProcessResult {
                value: DocumentStructure::empty(),
                errors,
                warnings,
            };
        }

        // Sort by line number (should already be sorted, but be safe)
        headers.sort_by_key(|(line, _)| *line);

        // Build the tree structure
        let mut root_sections: Vec<SectionNode> = Vec::new();
        let mut stack: Vec<(SectionNode, u8)> = Vec::new(); // (node, depth)

        let total_lines = doc.line_count();

        for (i, (line_idx, header)) in headers.iter().enumerate() {
            let depth = header.identifier.depth();

            // Determine end line (start of next section or end of document)
            let end_line = headers
                .get(i + 1)
                .map(|(next_line, _)| *next_line)
                .or(Some(total_lines));

            // Get the actual last token index for the end position
            let end_line_idx = end_line.unwrap_or(total_lines).saturating_sub(1);
            let last_token_idx = doc
                .get_line(end_line_idx)
                .map(|line| line.ll_tokens().len().saturating_sub(1))
                .unwrap_or(0);

            let node = SectionNode {
                header: header.clone(),
                start_line: *line_idx,
                end_line,
                content_span: DocSpan::new(
                    DocPosition::new(*line_idx, 0),
                    DocPosition::end_of_line(end_line_idx, last_token_idx),
                ),
                children: Vec::new(),
            };

            // Pop from stack until we find a parent (lower depth)
            while let Some((_, parent_depth)) = stack.last() {
                if *parent_depth >= depth {
                    // This item on stack is not a parent, pop it
                    let (finished_node, _finished_depth) = stack.pop().unwrap();

                    // Add to parent or root
                    if let Some((parent, _)) = stack.last_mut() {
                        parent.children.push(finished_node);
                    } else {
                        root_sections.push(finished_node);
                    }
                } else {
                    break;
                }
            }

            // Validate depth consistency
            if let Some((_, parent_depth)) = stack.last() {
                if depth <= *parent_depth {
                    warnings.push(format!(
                        "Line {}: section '{}' (depth {}) appears after deeper section (depth {})",
                        line_idx, header.raw_text, depth, parent_depth
                    ));
                }
            }

            // Push current node onto stack
            stack.push((node, depth));
        }

        // Drain remaining stack
        while let Some((finished_node, _)) = stack.pop() {
            if let Some((parent, _)) = stack.last_mut() {
                parent.children.push(finished_node);
            } else {
                root_sections.push(finished_node);
            }
        }

        ProcessResult {
            value: DocumentStructure {
                sections: root_sections,
            },
            errors,
            warnings,
        }
    }
}

/// Trait for components that process entire documents.
///
/// Unlike `Resolver` which operates on single lines, `DocumentProcessor`
/// operates on the complete `ContractDocument`.
pub trait DocumentProcessor {
    /// The output type produced by this processor.
    type Output;

    /// Process the document and produce output.
    fn process(&self, doc: &ContractDocument) -> ProcessResult<Self::Output>;
}

impl DocumentProcessor for DocumentStructureBuilder {
    type Output = DocumentStructure;

    fn process(&self, doc: &ContractDocument) -> ProcessResult<DocumentStructure> {
        Self::build(doc)
    }
}
