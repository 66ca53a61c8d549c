//! Shared catalog handle with atomic reload.
//!
//! Readers take a snapshot (`Arc<Catalog>`) and keep using it for as long as
//! they like; a reload builds the replacement without holding the lock and
//! swaps it in with a single write, so no reader ever observes a half-built
//! catalog.

use std::path::{Path, PathBuf};
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, warn};

use crate::catalog::{Catalog, LookupOptions};
use crate::config::StoreConfig;
use crate::error::{ParseError, ParseErrorKind};
use crate::plural::{same_language, LinguistPluralRules, PluralRuleProvider};

#[derive(Debug)]
pub struct CatalogStore {
    current: RwLock<Arc<Catalog>>,
    plurals: Arc<dyn PluralRuleProvider>,
    options: LookupOptions,
    expected_locale: Option<String>,
}

impl CatalogStore {
    /// Loads the initial catalog with Linguist's plural form tables.
    /// （以 Linguist 複數規則載入初始語系目錄。）
    pub fn load<I, P>(paths: I) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        Self::load_with(paths, Arc::new(LinguistPluralRules::new()), LookupOptions::default())
    }

    /// Loads with an explicit plural provider, kept for later reloads.
    pub fn load_with<I, P>(
        paths: I,
        plurals: Arc<dyn PluralRuleProvider>,
        options: LookupOptions,
    ) -> Result<Self, ParseError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let catalog = Catalog::load_with(paths, &*plurals, options)?;
        Ok(Self::with_parts(catalog, plurals, options, None))
    }

    /// Loads the catalogs a config names, enforcing its locale if one is set.
    pub fn from_config(config: &StoreConfig) -> Result<Self, ParseError> {
        let plurals: Arc<dyn PluralRuleProvider> = Arc::new(LinguistPluralRules::new());
        let options = config.lookup_options();
        let catalog = Catalog::load_with(&config.catalogs, &*plurals, options)?;
        check_locale(config.locale.as_deref(), &catalog)?;
        Ok(Self::with_parts(catalog, plurals, options, config.locale.clone()))
    }

    /// Wraps an already built catalog; reloads use Linguist's plural form tables.
    pub fn from_catalog(catalog: Catalog) -> Self {
        let options = catalog.options();
        Self::with_parts(catalog, Arc::new(LinguistPluralRules::new()), options, None)
    }

    fn with_parts(
        catalog: Catalog,
        plurals: Arc<dyn PluralRuleProvider>,
        options: LookupOptions,
        expected_locale: Option<String>,
    ) -> Self {
        info!(
            language = catalog.language(),
            files = catalog.sources().len(),
            "catalog store initialized"
        );
        Self {
            current: RwLock::new(Arc::new(catalog)),
            plurals,
            options,
            expected_locale,
        }
    }

    /// The catalog in effect right now; unaffected by later reloads.
    pub fn snapshot(&self) -> Arc<Catalog> {
        let guard = self.current.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Builds a new catalog from `paths`, publishes it and returns it.
    ///
    /// On failure the previously published catalog stays in effect.
    /// （重新載入並回傳新目錄；失敗時保留原目錄。）
    pub fn reload<I, P>(&self, paths: I) -> Result<Arc<Catalog>, ParseError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let built = Catalog::load_with(paths, &*self.plurals, self.options).and_then(|catalog| {
            check_locale(self.expected_locale.as_deref(), &catalog)?;
            Ok(catalog)
        });
        match built {
            Ok(catalog) => {
                let next = Arc::new(catalog);
                self.swap(Arc::clone(&next));
                Ok(next)
            }
            Err(error) => {
                warn!(%error, "catalog reload failed; keeping current catalog");
                Err(error)
            }
        }
    }

    /// Reloads from the files the current catalog was built from.
    /// （依目前目錄的來源檔案重新載入。）
    pub fn reload_sources(&self) -> Result<Arc<Catalog>, ParseError> {
        let sources: Vec<PathBuf> = self.snapshot().sources().to_vec();
        self.reload(&sources)
    }

    /// Swaps in `catalog` and returns the one it replaced.
    /// （發布新目錄並回傳被取代的目錄。）
    pub fn publish(&self, catalog: Catalog) -> Arc<Catalog> {
        self.swap(Arc::new(catalog))
    }

    fn swap(&self, next: Arc<Catalog>) -> Arc<Catalog> {
        let previous = {
            let mut guard = self.current.write().unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, Arc::clone(&next))
        };
        info!(
            language = next.language(),
            files = next.sources().len(),
            overrides = next.overrides().len(),
            "catalog published"
        );
        previous
    }

    /// Owned lookup against the current snapshot.
    pub fn lookup(
        &self,
        context: &str,
        source: &str,
        disambiguation: Option<&str>,
        count: Option<u64>,
    ) -> String {
        self.snapshot()
            .lookup(context, source, disambiguation, count)
            .to_string()
    }

    /// Owned lookup plus `%n` and `%1`..`%9` expansion.
    /// （查詢並展開佔位符，回傳擁有所有權的字串。）
    pub fn translate<S: AsRef<str>>(
        &self,
        context: &str,
        source: &str,
        disambiguation: Option<&str>,
        count: Option<u64>,
        arguments: &[S],
    ) -> String {
        self.snapshot()
            .translate(context, source, disambiguation, count, arguments)
            .into_owned()
    }
}

fn check_locale(expected: Option<&str>, catalog: &Catalog) -> Result<(), ParseError> {
    match expected {
        Some(expected) if !same_language(expected, catalog.language()) => {
            let error = ParseError::new(ParseErrorKind::LocaleConflict {
                expected: expected.to_string(),
                found: catalog.language().to_string(),
            });
            Err(match catalog.sources().first() {
                Some(path) => error.with_path(path),
                None => error,
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    const FIRST: &str = r#"<TS language="da"><context><name>C</name>
<message><source>Save</source><translation>Gem</translation></message>
</context></TS>"#;

    const SECOND: &str = r#"<TS language="da"><context><name>C</name>
<message><source>Save</source><translation>Gem nu</translation></message>
</context></TS>"#;

    #[test]
    fn snapshots_survive_publish() {
        let store = CatalogStore::from_catalog(Catalog::from_ts_str(FIRST).expect("first"));
        let before = store.snapshot();
        let previous = store.publish(Catalog::from_ts_str(SECOND).expect("second"));

        assert!(Arc::ptr_eq(&before, &previous));
        assert_eq!(before.lookup("C", "Save", None, None), "Gem");
        assert_eq!(store.lookup("C", "Save", None, None), "Gem nu");
    }

    #[test]
    fn reload_returns_the_published_catalog() {
        let temp = tempfile::tempdir().expect("tempdir");
        let path = temp.path().join("app_da.ts");
        std::fs::write(&path, SECOND).expect("write");

        let store = CatalogStore::from_catalog(Catalog::from_ts_str(FIRST).expect("first"));
        let returned = store.reload([&path]).expect("reload");

        assert_eq!(returned.lookup("C", "Save", None, None), "Gem nu");
        assert!(Arc::ptr_eq(&returned, &store.snapshot()));
    }

    #[test]
    fn failed_reload_keeps_current_catalog() {
        let store = CatalogStore::from_catalog(Catalog::from_ts_str(FIRST).expect("first"));
        let error = store
            .reload(["/nonexistent/catalog_da.ts"])
            .expect_err("missing file");
        assert!(matches!(error.kind(), ParseErrorKind::Read(_)));
        assert_eq!(store.lookup("C", "Save", None, None), "Gem");
    }

    #[test]
    fn readers_see_complete_catalogs_during_publish() {
        let store = Arc::new(CatalogStore::from_catalog(
            Catalog::from_ts_str(FIRST).expect("first"),
        ));
        let readers: Vec<_> = (0..4)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for _ in 0..200 {
                        let text = store.lookup("C", "Save", None, None);
                        assert!(text == "Gem" || text == "Gem nu", "unexpected {text}");
                    }
                })
            })
            .collect();
        for round in 0..20 {
            let input = if round % 2 == 0 { SECOND } else { FIRST };
            store.publish(Catalog::from_ts_str(input).expect("parse"));
        }
        for reader in readers {
            reader.join().expect("reader thread");
        }
    }

    #[test]
    fn translate_returns_owned_text() {
        let store = CatalogStore::from_catalog(Catalog::from_ts_str(FIRST).expect("first"));
        assert_eq!(store.translate("C", "Open %1", None, None, &["a.txt"]), "Open a.txt");
    }
}
