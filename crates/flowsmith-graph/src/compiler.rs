//! Graph compilation
//!
//! Consumes normalized rows and produces the flow graph: pages, intents,
//! routes, webhook tags, the end-state set, and the designated first
//! page. Row-level problems are logged and skipped; compilation of the
//! remaining rows always continues, so a sheet always yields a
//! best-effort graph rather than failing outright.

use std::collections::BTreeSet;

use crate::cell;
use crate::fields;
use crate::graph::{FlowGraph, RouteEntry};
use crate::table::{Row, RowTable};
use crate::tag;

/// Conventional start-page placeholders, excluded from first-page
/// eligibility (compared case-insensitively).
const START_ALIASES: &[&str] = &["startpage", "start_page", "start"];

/// Outcome of compiling a table: the graph plus everything worth
/// surfacing to the caller.
#[derive(Debug, Clone)]
pub struct CompileReport {
    /// The compiled flow graph
    pub graph: FlowGraph,
    /// Recoverable problems encountered along the way
    pub warnings: Vec<String>,
    /// Rows skipped for lack of a page name
    pub skipped_rows: usize,
}

/// Incremental graph compiler. Feed rows with [`ingest`](Self::ingest),
/// then call [`finish`](Self::finish) for the terminal-page inference
/// pass and the final report.
#[derive(Debug)]
pub struct GraphCompiler {
    graph: FlowGraph,
    all_pages: BTreeSet<String>,
    pages_with_routes: BTreeSet<String>,
    warnings: Vec<String>,
    skipped_rows: usize,
    next_row: usize,
}

impl GraphCompiler {
    /// Create a compiler for a table with the given provenance.
    pub fn new(source_file: &str, has_step_info: bool) -> Self {
        Self {
            graph: FlowGraph::new(source_file, has_step_info),
            all_pages: BTreeSet::new(),
            pages_with_routes: BTreeSet::new(),
            warnings: Vec::new(),
            skipped_rows: 0,
            next_row: 0,
        }
    }

    /// Record a recoverable warning.
    fn warn(&mut self, message: String) {
        tracing::warn!("{message}");
        self.warnings.push(message);
    }

    /// Process one row, registering its page, intents, and routes.
    pub fn ingest(&mut self, row: &Row) {
        let idx = self.next_row;
        self.next_row += 1;
        // Sheet line number: 1-based plus the header line.
        let line = idx + 2;

        let Some(page) = cell::normalize_opt(row.page_name.as_deref()) else {
            tracing::debug!(line, "skipping row without a page name");
            self.skipped_rows += 1;
            return;
        };
        self.all_pages.insert(page.clone());

        let intent_name_raw = cell::normalize_opt(row.intent_name.as_deref());
        let bot_prompt = cell::normalize_opt(row.bot_prompt.as_deref());
        let next_page_cell = cell::normalize_opt(row.next_page.as_deref());
        let params = cell::normalize_opt(row.parameter_set.as_deref())
            .map(|s| fields::parse_params(&s))
            .unwrap_or_default();
        let chips = row
            .chips
            .as_deref()
            .map(fields::parse_chips)
            .unwrap_or_default();

        let user_example = cell::normalize_opt(row.trigger.as_deref())
            .map(|raw| fields::parse_trigger(&raw).example)
            .filter(|example| !example.is_empty());

        let webhook_action_raw = cell::normalize_opt(row.webhook_action.as_deref());
        let webhook_tag = webhook_action_raw.as_deref().and_then(tag::webhook_tag);
        if let (Some(tag), Some(action)) = (&webhook_tag, &webhook_action_raw) {
            self.graph.webhooks.insert(tag.clone(), action.clone());
        }

        let entry = self.graph.pages.entry(page.clone()).or_default();
        if let Some(prompt) = &bot_prompt {
            if !entry.prompts.contains(prompt) {
                entry.prompts.push(prompt.clone());
            }
        }
        for chip in &chips {
            if !entry.chips.contains(chip) {
                entry.chips.push(chip.clone());
            }
        }
        if let Some(step) = cell::normalize_opt(row.step.as_deref()) {
            entry.metadata.insert("step".to_string(), step);
        }
        if let Some(next_step) = cell::normalize_opt(row.next_step.as_deref()) {
            entry.metadata.insert("next_step".to_string(), next_step);
        }

        if self.graph.first_page.is_none()
            && !START_ALIASES.contains(&page.to_lowercase().as_str())
        {
            self.graph.first_page = Some(page.clone());
        }

        let resolved = fields::parse_next_pages(next_page_cell.as_deref(), chips.len().max(1));
        if let Some(mismatch) = resolved.mismatch {
            self.warn(format!(
                "row {line}: next-page count ({}) does not match chip count ({})",
                mismatch.targets, mismatch.chips
            ));
        }

        let parameters = if params.is_empty() {
            None
        } else {
            Some(params)
        };

        let mut has_valid_route = false;
        if chips.is_empty() {
            // Generated names embed the row position so repeated unnamed
            // rows on the same page never collide.
            let intent_name = intent_name_raw
                .unwrap_or_else(|| format!("Intent_{}_{}", tag::slugify(&page), idx));
            let intent = self.graph.intents.entry(intent_name.clone()).or_default();
            if let Some(example) = &user_example {
                if !intent.training_phrases.contains(example) {
                    intent.training_phrases.push(example.clone());
                }
            }

            if let Some(target) = resolved.targets.first().cloned().flatten() {
                self.graph.routes.push(RouteEntry {
                    page: page.clone(),
                    intent: intent_name,
                    next_page: Some(target),
                    webhook_action: webhook_tag,
                    parameters,
                });
                self.pages_with_routes.insert(page.clone());
                has_valid_route = true;
            } else {
                tracing::debug!(page = %page, "page is an end state (no next page)");
            }
        } else {
            let base_intent = intent_name_raw
                .unwrap_or_else(|| format!("Intent_{}", tag::slugify(&page)));
            for (i, chip) in chips.iter().enumerate() {
                // One intent per (page, chip), named to disambiguate.
                let chip_intent_name = format!("{base_intent} :: {chip}");
                let intent = self
                    .graph
                    .intents
                    .entry(chip_intent_name.clone())
                    .or_default();
                if !intent.training_phrases.contains(chip) {
                    intent.training_phrases.push(chip.clone());
                }
                if let Some(example) = &user_example {
                    if !intent.training_phrases.contains(example) {
                        intent.training_phrases.push(example.clone());
                    }
                }

                if let Some(target) = resolved.targets.get(i).cloned().flatten() {
                    self.graph.routes.push(RouteEntry {
                        page: page.clone(),
                        intent: chip_intent_name,
                        next_page: Some(target),
                        webhook_action: webhook_tag.clone(),
                        parameters: parameters.clone(),
                    });
                    self.pages_with_routes.insert(page.clone());
                    has_valid_route = true;
                } else {
                    tracing::debug!(page = %page, chip = %chip, "chip leads to an end state");
                }
            }
        }

        if !has_valid_route && bot_prompt.is_some() && !self.graph.end_pages.contains(&page) {
            self.graph.end_pages.push(page);
        }
    }

    /// Finish compilation: infer additional end states and produce the
    /// report.
    ///
    /// A page never used as any route's target, that is not the first
    /// page and has no outgoing routes of its own, is an end state even
    /// when the earlier per-row classification missed it.
    pub fn finish(mut self) -> CompileReport {
        let referenced: BTreeSet<&str> = self
            .graph
            .routes
            .iter()
            .filter_map(|r| r.next_page.as_deref())
            .collect();

        let mut inferred = Vec::new();
        for page in &self.all_pages {
            if referenced.contains(page.as_str()) {
                continue;
            }
            if self.graph.first_page.as_deref() == Some(page.as_str()) {
                continue;
            }
            if self.pages_with_routes.contains(page) {
                continue;
            }
            if !self.graph.end_pages.contains(page) {
                tracing::info!(page = %page, "page identified as end state (no incoming or outgoing routes)");
                inferred.push(page.clone());
            }
        }
        self.graph.end_pages.extend(inferred);

        CompileReport {
            graph: self.graph,
            warnings: self.warnings,
            skipped_rows: self.skipped_rows,
        }
    }
}

/// Compile a whole input table into a flow graph.
///
/// Missing required columns surface as warnings in the report, mirroring
/// the table reader's logging.
pub fn compile_table(table: &RowTable) -> CompileReport {
    let mut compiler = GraphCompiler::new(&table.source_file, table.has_step_info);
    for column in &table.missing_columns {
        compiler.warn(format!("missing required column: {column}"));
    }
    for row in &table.rows {
        compiler.ingest(row);
    }
    let report = compiler.finish();
    tracing::info!(
        source = %report.graph.metadata.source_file,
        pages = report.graph.pages.len(),
        intents = report.graph.intents.len(),
        routes = report.graph.routes.len(),
        end_pages = report.graph.end_pages.len(),
        "compiled flow graph"
    );
    report
}
