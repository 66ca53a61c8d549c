//! Immutable, indexed translation catalog.
//!
//! A [`Catalog`] keeps two views over the same messages: the ordered
//! document (for re-serialization) and a hash index from
//! context → source text → disambiguation for lookups.
//!
//! # Lookup contract
//!
//! | Situation | Result |
//! |-----------|--------|
//! | No message for the key | source text |
//! | Obsolete/vanished message | source text, unless obsolete lookups are enabled |
//! | Unfinished message | its translation, unless unfinished lookups are disabled |
//! | Present with empty singular text | empty string |
//! | Numerus message | form for the count's bucket, nearest lower non-empty form, then source |

use serde::Serialize;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ParseError, ParseErrorKind};
use crate::model::{Context, Message, MessageStatus, Translation, TsDocument};
use crate::plural::{
    same_language, LinguistPluralRules, PluralBucket, PluralRule, PluralRuleProvider,
};
use crate::substitute::expand;
use crate::ts_reader::{parse_ts, parse_ts_bytes, ParsedDocument};
use crate::ts_writer::{to_ts_string, WriteError};

/// Which message states are visible to lookups.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LookupOptions {
    pub include_obsolete: bool,
    pub include_unfinished: bool,
}

impl Default for LookupOptions {
    fn default() -> Self {
        Self {
            include_obsolete: false,
            include_unfinished: true,
        }
    }
}

impl LookupOptions {
    pub fn admits(&self, status: MessageStatus) -> bool {
        match status {
            MessageStatus::Finished => true,
            MessageStatus::Unfinished => self.include_unfinished,
            MessageStatus::Obsolete | MessageStatus::Vanished => self.include_obsolete,
        }
    }
}

/// Record of a message replaced by a later input during a merge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergeOverride {
    pub context: String,
    pub source: String,
    pub disambiguation: Option<String>,
    pub replaced_from: PathBuf,
    pub replaced_by: PathBuf,
}

/// A message key present in a reference catalog but not served by this one.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct MissingKey {
    pub context: String,
    pub source: String,
    pub disambiguation: Option<String>,
}

impl fmt::Display for MissingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {:?}", self.context, self.source)?;
        if let Some(disambiguation) = &self.disambiguation {
            write!(f, " ({disambiguation})")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogStats {
    pub language: String,
    pub plural_forms: usize,
    pub contexts: usize,
    pub messages: usize,
    pub finished: usize,
    pub unfinished: usize,
    pub obsolete: usize,
    pub numerus: usize,
    pub empty: usize,
    pub overrides: usize,
}

#[derive(Debug, Clone)]
struct IndexEntry {
    disambiguation: Option<String>,
    context: usize,
    message: usize,
}

type Index = HashMap<String, HashMap<String, Vec<IndexEntry>>>;

#[derive(Debug, Clone)]
pub struct Catalog {
    document: TsDocument,
    plural_rule: Arc<dyn PluralRule>,
    index: Index,
    sources: Vec<PathBuf>,
    overrides: Vec<MergeOverride>,
    options: LookupOptions,
}

impl Catalog {
    /// Loads and merges catalog files with Linguist's plural form tables.
    /// （載入並合併語系目錄檔案。）
    pub fn load<I, P>(paths: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::load_with(paths, &LinguistPluralRules::new(), LookupOptions::default())
    }

    /// Loads and merges catalog files with an explicit plural provider.
    pub fn load_with<I, P>(
        paths: I,
        plurals: &dyn PluralRuleProvider,
        options: LookupOptions,
    ) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut builder = CatalogBuilder::new(plurals).options(options);
        for path in paths {
            builder.add_file(path.as_ref())?;
        }
        builder.build()
    }

    /// Parses a single in-memory document.
    pub fn from_ts_str(input: &str) -> Result<Self, ParseError> {
        let plurals = LinguistPluralRules::new();
        let mut builder = CatalogBuilder::new(&plurals);
        builder.add_str("<memory>", input)?;
        builder.build()
    }

    pub fn language(&self) -> &str {
        &self.document.language
    }

    pub fn document(&self) -> &TsDocument {
        &self.document
    }

    pub fn contexts(&self) -> &[Context] {
        &self.document.contexts
    }

    pub fn plural_rule(&self) -> &dyn PluralRule {
        &*self.plural_rule
    }

    /// Input files in load order.
    pub fn sources(&self) -> &[PathBuf] {
        &self.sources
    }

    /// Messages replaced by later inputs during the merge.
    pub fn overrides(&self) -> &[MergeOverride] {
        &self.overrides
    }

    /// Visibility rules applied by [`Catalog::lookup`].
    pub fn options(&self) -> LookupOptions {
        self.options
    }

    /// Iterates every message with its context name, in document order.
    pub fn messages(&self) -> impl Iterator<Item = (&str, &Message)> {
        self.document.contexts.iter().flat_map(|context| {
            context
                .messages
                .iter()
                .map(move |message| (context.name.as_str(), message))
        })
    }

    /// Finds a message by key regardless of its status.
    pub fn find(
        &self,
        context: &str,
        source: &str,
        disambiguation: Option<&str>,
    ) -> Option<&Message> {
        let disambiguation = disambiguation.filter(|value| !value.is_empty());
        let entry = self
            .index
            .get(context)?
            .get(source)?
            .iter()
            .find(|entry| entry.disambiguation.as_deref() == disambiguation)?;
        self.document
            .contexts
            .get(entry.context)?
            .messages
            .get(entry.message)
    }

    /// Returns true when a lookup for the key would be served by this catalog.
    pub fn contains(&self, context: &str, source: &str, disambiguation: Option<&str>) -> bool {
        self.find(context, source, disambiguation)
            .is_some_and(|message| self.options.admits(message.status))
    }

    /// Translation for the key, degrading to `source` when nothing applies.
    /// （取得翻譯文字；缺少時回傳原文。）
    pub fn lookup<'a>(
        &'a self,
        context: &str,
        source: &'a str,
        disambiguation: Option<&str>,
        count: Option<u64>,
    ) -> &'a str {
        self.lookup_with(self.options, context, source, disambiguation, count)
    }

    /// Like [`Catalog::lookup`] with caller-supplied visibility rules.
    /// （以指定的可見性規則查詢翻譯。）
    pub fn lookup_with<'a>(
        &'a self,
        options: LookupOptions,
        context: &str,
        source: &'a str,
        disambiguation: Option<&str>,
        count: Option<u64>,
    ) -> &'a str {
        match self.find(context, source, disambiguation) {
            Some(message) if options.admits(message.status) => {
                self.resolve(message, count).unwrap_or(source)
            }
            _ => source,
        }
    }

    /// Lookup followed by `%n` and `%1`..`%9` expansion.
    pub fn translate<'a, S: AsRef<str>>(
        &'a self,
        context: &str,
        source: &'a str,
        disambiguation: Option<&str>,
        count: Option<u64>,
        arguments: &[S],
    ) -> Cow<'a, str> {
        expand(
            self.lookup(context, source, disambiguation, count),
            count,
            arguments,
        )
    }

    fn resolve<'a>(&'a self, message: &'a Message, count: Option<u64>) -> Option<&'a str> {
        match &message.translation {
            Translation::Single(form) => Some(form.text()),
            Translation::Plural(forms) => {
                let bucket = count
                    .map(|value| self.plural_rule.bucket_for(value))
                    .unwrap_or(PluralBucket::FIRST);
                forms.resolve(bucket)
            }
        }
    }

    /// Keys served by `reference` that this catalog does not serve.
    /// （與參考目錄比對，回傳缺少的鍵。）
    pub fn missing_keys(&self, reference: &Catalog) -> Vec<MissingKey> {
        let mut missing: Vec<MissingKey> = reference
            .messages()
            .filter(|(_, message)| reference.options.admits(message.status))
            .filter(|(context, message)| {
                !self.contains(context, &message.source, message.disambiguation.as_deref())
            })
            .map(|(context, message)| MissingKey {
                context: context.to_string(),
                source: message.source.clone(),
                disambiguation: message.disambiguation.clone(),
            })
            .collect();
        missing.sort();
        missing
    }

    /// Message counts by status and shape.
    /// （依狀態統計訊息數量。）
    pub fn stats(&self) -> CatalogStats {
        let mut stats = CatalogStats {
            language: self.document.language.clone(),
            plural_forms: self.plural_rule.cardinality(),
            contexts: self.document.contexts.len(),
            messages: 0,
            finished: 0,
            unfinished: 0,
            obsolete: 0,
            numerus: 0,
            empty: 0,
            overrides: self.overrides.len(),
        };
        for (_, message) in self.messages() {
            stats.messages += 1;
            match message.status {
                MessageStatus::Finished => stats.finished += 1,
                MessageStatus::Unfinished => stats.unfinished += 1,
                MessageStatus::Obsolete | MessageStatus::Vanished => stats.obsolete += 1,
            }
            match &message.translation {
                Translation::Plural(forms) => {
                    stats.numerus += 1;
                    if forms.iter().all(|form| form.is_empty()) {
                        stats.empty += 1;
                    }
                }
                Translation::Single(form) if form.is_empty() => stats.empty += 1,
                Translation::Single(_) => {}
            }
        }
        stats
    }

    /// Serializes the merged catalog back to a TS document.
    pub fn to_ts_string(&self) -> Result<String, WriteError> {
        to_ts_string(&self.document)
    }
}

/// Accumulates parsed documents and merges them last-wins.
pub struct CatalogBuilder<'p> {
    plurals: &'p dyn PluralRuleProvider,
    options: LookupOptions,
    document: Option<TsDocument>,
    plural_rule: Option<Arc<dyn PluralRule>>,
    contexts: HashMap<String, usize>,
    origins: HashMap<(usize, usize), usize>,
    positions: HashMap<(String, String, Option<String>), (usize, usize)>,
    sources: Vec<PathBuf>,
    overrides: Vec<MergeOverride>,
}

impl<'p> CatalogBuilder<'p> {
    pub fn new(plurals: &'p dyn PluralRuleProvider) -> Self {
        Self {
            plurals,
            options: LookupOptions::default(),
            document: None,
            plural_rule: None,
            contexts: HashMap::new(),
            origins: HashMap::new(),
            positions: HashMap::new(),
            sources: Vec::new(),
            overrides: Vec::new(),
        }
    }

    /// Visibility rules the built catalog applies to lookups.
    /// （設定建置後目錄的查詢可見性規則。）
    pub fn options(mut self, options: LookupOptions) -> Self {
        self.options = options;
        self
    }

    /// Reads, parses and merges one catalog file.
    ///
    /// The raw bytes go to the parser so a non-UTF-8 `encoding` declared
    /// in the XML header is decoded correctly.
    /// （讀取並合併單一語系目錄檔案，依宣告編碼解碼。）
    pub fn add_file(&mut self, path: &Path) -> Result<&mut Self, ParseError> {
        let contents = fs::read(path).map_err(|error| ParseError::read(path, error))?;
        self.add_bytes(path, &contents)
    }

    /// Parses encoded file contents and merges them.
    pub fn add_bytes(
        &mut self,
        origin: impl AsRef<Path>,
        input: &[u8],
    ) -> Result<&mut Self, ParseError> {
        let origin = origin.as_ref();
        let parsed = parse_ts_bytes(input, self.plurals).map_err(|error| error.with_path(origin))?;
        self.add_parsed(origin, parsed)
    }

    /// Parses `input` and merges it; `origin` names it in errors and override records.
    pub fn add_str(
        &mut self,
        origin: impl AsRef<Path>,
        input: &str,
    ) -> Result<&mut Self, ParseError> {
        let origin = origin.as_ref();
        let parsed = parse_ts(input, self.plurals).map_err(|error| error.with_path(origin))?;
        self.add_parsed(origin, parsed)
    }

    fn add_parsed(
        &mut self,
        origin: &Path,
        parsed: ParsedDocument,
    ) -> Result<&mut Self, ParseError> {
        debug!(
            path = %origin.display(),
            language = %parsed.document.language,
            contexts = parsed.document.contexts.len(),
            "parsed catalog"
        );
        self.merge(parsed.document, parsed.plural_rule, origin)?;
        Ok(self)
    }

    fn merge(
        &mut self,
        incoming: TsDocument,
        plural_rule: Arc<dyn PluralRule>,
        origin: &Path,
    ) -> Result<(), ParseError> {
        let origin_index = self.sources.len();
        if let Some(existing) = &self.document {
            if !same_language(&existing.language, &incoming.language) {
                return Err(ParseError::new(ParseErrorKind::LocaleConflict {
                    expected: existing.language.clone(),
                    found: incoming.language,
                })
                .with_path(origin));
            }
        }
        if self.plural_rule.is_none() {
            self.plural_rule = Some(plural_rule);
        }
        let document = self.document.get_or_insert_with(|| incoming.header());
        if document.source_language.is_none() {
            document.source_language = incoming.source_language.clone();
        }
        for dependency in &incoming.dependencies {
            if !document.dependencies.contains(dependency) {
                document.dependencies.push(dependency.clone());
            }
        }
        self.sources.push(origin.to_path_buf());

        for context in incoming.contexts {
            let context_index = *self
                .contexts
                .entry(context.name.clone())
                .or_insert_with(|| {
                    document.contexts.push(Context {
                        name: context.name.clone(),
                        comment: context.comment.clone(),
                        messages: Vec::new(),
                    });
                    document.contexts.len() - 1
                });
            let target = &mut document.contexts[context_index];
            if target.comment.is_none() {
                target.comment = context.comment;
            }

            for message in context.messages {
                let key = (
                    context.name.clone(),
                    message.source.clone(),
                    message.disambiguation.clone(),
                );
                match self.positions.get(&key) {
                    Some(&(context_at, message_at)) => {
                        let previous = self
                            .origins
                            .insert((context_at, message_at), origin_index)
                            .and_then(|index| self.sources.get(index).cloned())
                            .unwrap_or_default();
                        warn!(
                            context = %key.0,
                            source = %key.1,
                            replaced_from = %previous.display(),
                            replaced_by = %origin.display(),
                            "catalog message overridden by later input"
                        );
                        self.overrides.push(MergeOverride {
                            context: key.0,
                            source: key.1,
                            disambiguation: key.2,
                            replaced_from: previous,
                            replaced_by: origin.to_path_buf(),
                        });
                        document.contexts[context_at].messages[message_at] = message;
                    }
                    None => {
                        let target = &mut document.contexts[context_index];
                        target.messages.push(message);
                        let position = (context_index, target.messages.len() - 1);
                        self.origins.insert(position, origin_index);
                        self.positions.insert(key, position);
                    }
                }
            }
        }
        Ok(())
    }

    /// Finishes the merge and builds the lookup index.
    ///
    /// Fails with `NoInputs` when nothing was added.
    /// （完成合併並建立查詢索引。）
    pub fn build(self) -> Result<Catalog, ParseError> {
        let (Some(document), Some(plural_rule)) = (self.document, self.plural_rule) else {
            return Err(ParseError::new(ParseErrorKind::NoInputs));
        };

        let mut index = Index::new();
        for (context_index, context) in document.contexts.iter().enumerate() {
            let by_source = index.entry(context.name.clone()).or_default();
            for (message_index, message) in context.messages.iter().enumerate() {
                by_source
                    .entry(message.source.clone())
                    .or_default()
                    .push(IndexEntry {
                        disambiguation: message.disambiguation.clone(),
                        context: context_index,
                        message: message_index,
                    });
            }
        }

        Ok(Catalog {
            document,
            plural_rule,
            index,
            sources: self.sources,
            overrides: self.overrides,
            options: self.options,
        })
    }
}
