pub mod catalog;
pub mod config;
pub mod error;
pub mod model;
pub mod plural;
pub mod store;
pub mod substitute;
pub mod ts_reader;
pub mod ts_writer;

pub use catalog::{Catalog, CatalogBuilder, CatalogStats, LookupOptions, MergeOverride, MissingKey};
pub use config::{ConfigError, StoreConfig};
pub use error::{ParseError, ParseErrorKind};
pub use model::{
    Context, ExtraField, Form, Location, Message, MessageKey, MessageStatus, PluralForms,
    Translation, TsDocument,
};
pub use plural::{
    normalize_locale, same_language, FixedPluralRule, FixedPluralRules, IcuPluralRule,
    IcuPluralRules, LinguistPluralRules, PluralBucket, PluralCategory, PluralRule,
    PluralRuleProvider,
};
pub use store::CatalogStore;
pub use substitute::{substitute, substitute_count};
pub use ts_reader::{parse_ts, parse_ts_bytes, ParsedDocument};
pub use ts_writer::{to_ts_string, write_ts, WriteError};
