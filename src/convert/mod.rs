//! Template orchestration.
//!
//! [`TemplateEngine`] wires the stages together: detection, ingestion,
//! classification and extraction in the parse phase, then substitution and
//! emission in the generate phase. When a template has no structured
//! content the engine falls back to a keyword-matched boilerplate.
//!
//! # Example
//!
//! ```no_run
//! use retemplate::convert::TemplateEngine;
//! use retemplate::model::{ValueMap, VariableValue};
//! use retemplate::render::GenerationOptions;
//!
//! fn main() -> retemplate::Result<()> {
//!     let engine = TemplateEngine::new();
//!     let bytes = std::fs::read("lease.docx")?;
//!     let outcome = engine.ingest(&bytes, "lease.docx")?;
//!
//!     let mut values = ValueMap::new();
//!     values.insert("甲方名称".to_string(), VariableValue::new("广州A公司"));
//!     let result = engine.generate(Some(&outcome.record), &values, &GenerationOptions::default());
//!     std::fs::write("out.docx", &result.binary)?;
//!     Ok(())
//! }
//! ```

mod fallback;

pub use fallback::BoilerplateKind;

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::classify::{ClassifierConfig, LayoutClassifier};
use crate::detect::detect_source_kind;
use crate::error::{Error, Result, Warning};
use crate::model::{
    ContentBlock, LogicalVariable, ParsedDocument, SourceKind, TemplateRecord, ValueMap,
    VariablePlaceholder, VariableSchema,
};
use crate::parser::{DocxAdapter, IngestOptions, IngestionAdapter, PdfAdapter};
use crate::render::{
    count_block_words, emit, GenerationMetadata, GenerationOptions, GenerationPath,
    GenerationResult,
};
use crate::variable::{
    extract, extract_blocks, group_by_name, missing_values_with_schema, SubstitutionEngine,
    SubstitutionOptions,
};

/// Everything the parse phase produces.
#[derive(Debug, Clone)]
pub struct IngestOutcome {
    /// The normalized document
    pub document: ParsedDocument,
    /// State to persist for the generate phase
    pub record: TemplateRecord,
    /// Every placeholder occurrence, in document order
    pub placeholders: Vec<VariablePlaceholder>,
    /// Placeholders grouped by logical name
    pub variables: Vec<LogicalVariable>,
    /// Soft failures from ingestion and classification
    pub warnings: Vec<Warning>,
}

/// Ingestion adapters keyed by source kind.
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: HashMap<SourceKind, Arc<dyn IngestionAdapter>>,
}

impl AdapterRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry with the DOCX and PDF adapters.
    pub fn with_defaults(options: &IngestOptions) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(DocxAdapter::new(options.clone())));
        registry.register(Arc::new(PdfAdapter::new(options.clone())));
        registry
    }

    /// Register an adapter, replacing any adapter for the same kind.
    pub fn register(&mut self, adapter: Arc<dyn IngestionAdapter>) {
        self.adapters.insert(adapter.source_kind(), adapter);
    }

    /// Get the adapter for a source kind.
    pub fn get(&self, kind: SourceKind) -> Option<Arc<dyn IngestionAdapter>> {
        self.adapters.get(&kind).cloned()
    }

    /// Check if a source kind has an adapter.
    pub fn supports(&self, kind: SourceKind) -> bool {
        self.adapters.contains_key(&kind)
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&str> = self.adapters.values().map(|a| a.name()).collect();
        names.sort_unstable();
        f.debug_struct("AdapterRegistry").field("adapters", &names).finish()
    }
}

/// Runs the parse and generate phases.
///
/// Holds only immutable configuration, so one engine can serve concurrent
/// requests.
#[derive(Debug, Clone)]
pub struct TemplateEngine {
    ingest_options: IngestOptions,
    classifier: LayoutClassifier,
    substitution: SubstitutionOptions,
    registry: AdapterRegistry,
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl TemplateEngine {
    /// Create an engine with default configuration and adapters.
    pub fn new() -> Self {
        let ingest_options = IngestOptions::default();
        Self {
            registry: AdapterRegistry::with_defaults(&ingest_options),
            ingest_options,
            classifier: LayoutClassifier::default(),
            substitution: SubstitutionOptions::default(),
        }
    }

    /// Set ingest options. Resets the registry to the default adapters.
    pub fn with_ingest_options(mut self, options: IngestOptions) -> Self {
        self.registry = AdapterRegistry::with_defaults(&options);
        self.ingest_options = options;
        self
    }

    /// Set the classifier configuration.
    pub fn with_classifier_config(mut self, config: ClassifierConfig) -> Self {
        self.classifier = LayoutClassifier::new(config);
        self
    }

    /// Set substitution formatting options.
    pub fn with_substitution_options(mut self, options: SubstitutionOptions) -> Self {
        self.substitution = options;
        self
    }

    /// Register an additional or replacement adapter.
    pub fn with_adapter(mut self, adapter: Arc<dyn IngestionAdapter>) -> Self {
        self.registry.register(adapter);
        self
    }

    /// Ingest options in use.
    pub fn ingest_options(&self) -> &IngestOptions {
        &self.ingest_options
    }

    /// The adapter registry.
    pub fn registry(&self) -> &AdapterRegistry {
        &self.registry
    }

    /// The layout classifier.
    pub fn classifier(&self) -> &LayoutClassifier {
        &self.classifier
    }

    /// Parse an uploaded template.
    ///
    /// Hard failures are returned as errors. A document without text is not
    /// an error: it yields zero blocks and an `EmptyContent` warning.
    pub fn ingest(&self, bytes: &[u8], file_name: &str) -> Result<IngestOutcome> {
        let kind = detect_source_kind(bytes, file_name)?;
        let adapter = self.registry.get(kind).ok_or_else(|| {
            Error::UnsupportedFormat(format!("no adapter registered for {} documents", kind))
        })?;

        let mut warnings = Vec::new();
        let document = match adapter.parse(bytes, file_name) {
            Ok(ingestion) => {
                warnings.extend(ingestion.warnings);
                ingestion.document
            }
            Err(e) if !e.is_hard() => {
                log::warn!("{} '{}': {}", adapter.name(), file_name, e);
                warnings.push(Warning::EmptyContent);
                ParsedDocument::new(kind, file_name)
            }
            Err(e) => return Err(e),
        };

        let classification = self.classifier.classify_document(&document);
        warnings.extend(classification.warnings);

        let placeholders = if classification.blocks.is_empty() {
            extract(&document.raw_text)
        } else {
            extract_blocks(&classification.blocks)
        };
        let variables = group_by_name(&placeholders);

        let record = TemplateRecord {
            id: file_name.to_string(),
            source_kind: kind,
            raw_text: document.raw_text.clone(),
            markup: document.markup.clone(),
            blocks: classification.blocks,
            metadata: document.metadata.clone(),
            variables: variables.clone(),
            page_size: match kind {
                SourceKind::FixedLayout => document.pages.first().map(|p| p.dimensions()),
                SourceKind::Flowed => None,
            },
        };

        log::info!(
            "Ingested '{}' ({}): {} blocks, {} placeholders, {} variables, {} warnings",
            file_name,
            kind,
            record.blocks.len(),
            placeholders.len(),
            variables.len(),
            warnings.len()
        );

        Ok(IngestOutcome {
            document,
            record,
            placeholders,
            variables,
            warnings,
        })
    }

    /// Parse a template file on disk.
    pub fn ingest_path(&self, path: impl AsRef<Path>) -> Result<IngestOutcome> {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        self.ingest(&bytes, file_name)
    }

    /// Generate a document from a stored template.
    ///
    /// Uses the structured path when the record has content. Otherwise the
    /// record's title or id selects a boilerplate.
    pub fn generate(
        &self,
        record: Option<&TemplateRecord>,
        values: &ValueMap,
        options: &GenerationOptions,
    ) -> GenerationResult {
        self.generate_with_hint(record, None, values, options)
    }

    /// Like [`TemplateEngine::generate`], with an explicit boilerplate hint
    /// such as a contract title.
    pub fn generate_with_hint(
        &self,
        record: Option<&TemplateRecord>,
        hint: Option<&str>,
        values: &ValueMap,
        options: &GenerationOptions,
    ) -> GenerationResult {
        if let Some(record) = record.filter(|r| r.has_structure()) {
            return self.generate_structured(record, values, options);
        }

        let hint = hint.map(str::to_string).or_else(|| {
            record.and_then(|r| {
                r.metadata
                    .title
                    .clone()
                    .or_else(|| Some(r.id.clone()).filter(|id| !id.is_empty()))
            })
        });
        match hint {
            Some(hint) => self.generate_fallback(&hint, values, options),
            None => GenerationResult::failed(
                "template has no structured content and no hint to select a boilerplate",
            ),
        }
    }

    /// Fill and emit the boilerplate selected by `hint`.
    pub fn generate_fallback(
        &self,
        hint: &str,
        values: &ValueMap,
        options: &GenerationOptions,
    ) -> GenerationResult {
        let kind = BoilerplateKind::from_hint(hint);
        log::warn!(
            "No structured template content, using {} boilerplate for '{}'",
            kind,
            hint
        );

        let classification = self.classifier.classify_text(kind.text());
        let engine = SubstitutionEngine::new(self.substitution.clone());
        self.render(
            &classification.blocks,
            &engine,
            &VariableSchema::default(),
            values,
            options,
            GenerationPath::Fallback,
            classification.warnings,
        )
    }

    /// Ingest an upload and generate from it in one call.
    ///
    /// A successful ingestion always takes the structured path, so an
    /// upload without text yields an empty document carrying the
    /// `EmptyContent` warning rather than a boilerplate. A hard ingestion
    /// error is never swallowed: the result carries the error message and
    /// an `IngestionFallback` warning next to the boilerplate output.
    pub fn generate_from_upload(
        &self,
        bytes: &[u8],
        file_name: &str,
        values: &ValueMap,
        options: &GenerationOptions,
    ) -> GenerationResult {
        match self.ingest(bytes, file_name) {
            Ok(outcome) => {
                let mut result = self.generate_structured(&outcome.record, values, options);
                let mut warnings = outcome.warnings;
                warnings.append(&mut result.warnings);
                result.warnings = warnings;
                result
            }
            Err(e) => {
                let reason = e.to_string();
                let warning = Warning::IngestionFallback {
                    reason: reason.clone(),
                };
                log::warn!("'{}': {}", file_name, warning);

                let mut result = self.generate_fallback(file_name, values, options);
                result.error = Some(reason);
                result.warnings.insert(0, warning);
                result
            }
        }
    }

    fn generate_structured(
        &self,
        record: &TemplateRecord,
        values: &ValueMap,
        options: &GenerationOptions,
    ) -> GenerationResult {
        let mut warnings = Vec::new();
        let blocks: Cow<'_, [ContentBlock]> = if record.blocks.is_empty() {
            // Stored text only, classify it again
            let mut document = ParsedDocument::new(record.source_kind, record.id.as_str());
            document.raw_text = record.raw_text.clone();
            document.markup = record.markup.clone();
            let classification = self.classifier.classify_document(&document);
            warnings.extend(classification.warnings);
            Cow::Owned(classification.blocks)
        } else {
            Cow::Borrowed(record.blocks.as_slice())
        };

        let options: Cow<'_, GenerationOptions> = match (options.page_size, record.page_size) {
            (None, Some((width, height))) if record.source_kind == SourceKind::FixedLayout => {
                Cow::Owned(options.clone().with_page_size(width, height))
            }
            _ => Cow::Borrowed(options),
        };

        let schema = record
            .variables
            .iter()
            .filter(|v| !v.required)
            .fold(VariableSchema::new(), |schema, v| schema.optional(v.name.clone()));
        let engine =
            SubstitutionEngine::new(self.substitution.clone()).with_aliases(&record.variables);

        self.render(
            &blocks,
            &engine,
            &schema,
            values,
            &options,
            GenerationPath::Structured,
            warnings,
        )
    }

    #[allow(clippy::too_many_arguments)]
    fn render(
        &self,
        blocks: &[ContentBlock],
        engine: &SubstitutionEngine,
        schema: &VariableSchema,
        values: &ValueMap,
        options: &GenerationOptions,
        path: GenerationPath,
        mut warnings: Vec<Warning>,
    ) -> GenerationResult {
        let outcome = engine.substitute(blocks, values);
        warnings.extend(missing_values_with_schema(&outcome.blocks, schema));

        match emit(&outcome.blocks, options) {
            Ok(emission) => {
                warnings.extend(emission.warnings);
                let metadata = GenerationMetadata {
                    page_count: emission.page_count,
                    word_count: count_block_words(&outcome.blocks),
                    variables_substituted: outcome.replaced.len() as u32,
                    block_count: outcome.blocks.len() as u32,
                };
                log::info!(
                    "Generated {} bytes ({:?}): {} blocks, {} variables substituted",
                    emission.bytes.len(),
                    path,
                    metadata.block_count,
                    metadata.variables_substituted
                );
                GenerationResult::ok(emission.bytes, metadata, options.output_format)
                    .with_path(path)
                    .with_warnings(warnings)
            }
            Err(e) => {
                log::warn!("Emission failed: {}", e);
                GenerationResult::failed(e.to_string())
                    .with_path(path)
                    .with_warnings(warnings)
            }
        }
    }
}
