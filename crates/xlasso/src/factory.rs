//! Sheet supply and caching
//!
//! The [`SheetsFactory`] maps `[book]` and sheet selectors onto the
//! registered [`SheetBackend`]s and caches every sheet it opens. The first
//! request for a sheet opens it; concurrent requests for the same sheet
//! wait on that one open instead of racing it.

use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use once_cell::sync::OnceCell;
use xlasso_core::{Error, Result, Sheet, SheetBackend};

use crate::ast::SheetSelector;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct SheetKey {
    book: String,
    index: usize,
}

type SheetSlot = Arc<OnceCell<Arc<dyn Sheet>>>;

/// Supplies sheet handles for selectors, caching them by identity
#[derive(Debug, Default)]
pub struct SheetsFactory {
    /// Registration order; the first backend is the default one
    backends: RwLock<Vec<Arc<dyn SheetBackend>>>,
    cache: RwLock<AHashMap<SheetKey, SheetSlot>>,
    /// Sheets registered without a backend
    loose: RwLock<Vec<Arc<dyn Sheet>>>,
    /// Starting sheet for bare references
    default_sheet: RwLock<Option<Arc<dyn Sheet>>>,
}

impl SheetsFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`add_backend`](Self::add_backend)
    pub fn with_backend<B: SheetBackend + 'static>(self, backend: B) -> Self {
        self.add_backend(Arc::new(backend));
        self
    }

    /// Register a backend, replacing any backend with the same id
    pub fn add_backend(&self, backend: Arc<dyn SheetBackend>) {
        let id = backend.id().to_string();
        {
            let mut backends = self.backends.write().unwrap_or_else(|e| e.into_inner());
            match backends.iter().position(|b| b.id() == id) {
                Some(index) => backends[index] = backend,
                None => backends.push(backend),
            }
        }
        self.cache
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|key, _| key.book != id);
        log::debug!("registered sheet backend '{}'", id);
    }

    /// Register a standalone sheet and make it the default sheet
    ///
    /// Standalone sheets answer selectors only while no backend is
    /// registered.
    pub fn add_sheet(&self, sheet: Arc<dyn Sheet>) {
        self.loose
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(sheet.clone());
        self.set_default_sheet(sheet);
    }

    /// Find a backend by id, exactly first, then case-insensitively
    pub fn backend(&self, book: &str) -> Option<Arc<dyn SheetBackend>> {
        let backends = self.backends.read().unwrap_or_else(|e| e.into_inner());
        backends
            .iter()
            .find(|b| b.id() == book)
            .or_else(|| backends.iter().find(|b| b.id().eq_ignore_ascii_case(book)))
            .cloned()
    }

    fn default_backend(&self) -> Option<Arc<dyn SheetBackend>> {
        self.backends
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .first()
            .cloned()
    }

    /// Sheet names of `book`, or of the default backend
    pub fn list_sheet_names(&self, book: Option<&str>) -> Result<Vec<String>> {
        match self.select_backend(book)? {
            Some(backend) => Ok(backend.sheet_names()),
            None => Ok(self
                .loose
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .iter()
                .map(|s| s.name().to_string())
                .collect()),
        }
    }

    fn select_backend(&self, book: Option<&str>) -> Result<Option<Arc<dyn SheetBackend>>> {
        match book {
            Some(id) => self
                .backend(id)
                .map(Some)
                .ok_or_else(|| Error::WorkbookNotFound(id.to_string())),
            None => Ok(self.default_backend()),
        }
    }

    /// Fetch the sheet picked by `book` and `selector`
    ///
    /// With neither, this is the default sheet, else the first sheet of the
    /// default backend. A book without a selector means its first sheet.
    pub fn get_sheet(
        &self,
        book: Option<&str>,
        selector: Option<&SheetSelector>,
    ) -> Result<Arc<dyn Sheet>> {
        self.fetch_sheet(book, selector, None)
    }

    /// Fetch a sheet on behalf of a caller whose current sheet is `current`
    ///
    /// Without book and selector this is `current` itself, falling back to
    /// the default sheet. A selector without a book picks among the
    /// siblings of `current` when its workbook is registered, and among
    /// the default backend's sheets otherwise.
    pub fn fetch_sheet(
        &self,
        book: Option<&str>,
        selector: Option<&SheetSelector>,
        current: Option<&Arc<dyn Sheet>>,
    ) -> Result<Arc<dyn Sheet>> {
        let current = current.cloned().or_else(|| self.default_sheet());
        if book.is_none() && selector.is_none() {
            if let Some(current) = &current {
                return Ok(current.clone());
            }
        }

        let backend = match book {
            Some(_) => self.select_backend(book)?,
            None => current
                .as_ref()
                .and_then(|sheet| self.backend_of(sheet.as_ref()))
                .or_else(|| self.default_backend()),
        };

        match backend {
            Some(backend) => {
                let names = backend.sheet_names();
                let index = select_index(&names, selector)?;
                self.open_cached(backend.as_ref(), index)
            }
            None => {
                let loose = self.loose.read().unwrap_or_else(|e| e.into_inner());
                let names: Vec<String> = loose.iter().map(|s| s.name().to_string()).collect();
                let index = select_index(&names, selector)?;
                Ok(loose[index].clone())
            }
        }
    }

    /// The registered backend `sheet` was opened from
    fn backend_of(&self, sheet: &dyn Sheet) -> Option<Arc<dyn SheetBackend>> {
        let book = &sheet.id().book;
        if book.is_empty() {
            return None;
        }
        self.backends
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|b| b.id() == book)
            .cloned()
    }

    fn open_cached(&self, backend: &dyn SheetBackend, index: usize) -> Result<Arc<dyn Sheet>> {
        let key = SheetKey {
            book: backend.id().to_string(),
            index,
        };

        let cached = self
            .cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&key)
            .cloned();
        let slot = match cached {
            Some(slot) => slot,
            None => self
                .cache
                .write()
                .unwrap_or_else(|e| e.into_inner())
                .entry(key)
                .or_default()
                .clone(),
        };

        if let Some(sheet) = slot.get() {
            log::trace!("sheet cache hit for {}", sheet.id());
            return Ok(sheet.clone());
        }
        slot.get_or_try_init(|| backend.open_sheet(index))
            .map(Arc::clone)
    }

    /// The sheet bare references start from, if set
    pub fn default_sheet(&self) -> Option<Arc<dyn Sheet>> {
        self.default_sheet
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn set_default_sheet(&self, sheet: Arc<dyn Sheet>) {
        *self.default_sheet.write().unwrap_or_else(|e| e.into_inner()) = Some(sheet);
    }

    /// Number of sheets opened and held by the cache
    pub fn cached_count(&self) -> usize {
        self.cache
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .filter(|slot| slot.get().is_some())
            .count()
    }

    /// Drop every cached sheet, standalone sheets and the default sheet.
    /// Backends stay registered.
    pub fn close(&self) {
        self.cache.write().unwrap_or_else(|e| e.into_inner()).clear();
        self.loose.write().unwrap_or_else(|e| e.into_inner()).clear();
        *self.default_sheet.write().unwrap_or_else(|e| e.into_inner()) = None;
        log::debug!("sheets factory closed");
    }
}

/// Position of the sheet `selector` picks among `names`
fn select_index(names: &[String], selector: Option<&SheetSelector>) -> Result<usize> {
    let missing = |what: String| Error::SheetNotFound(what);
    match selector {
        None | Some(SheetSelector::First) => {
            if names.is_empty() {
                Err(missing("first sheet of an empty workbook".into()))
            } else {
                Ok(0)
            }
        }
        Some(SheetSelector::Last) => names
            .len()
            .checked_sub(1)
            .ok_or_else(|| missing("last sheet of an empty workbook".into())),
        Some(SheetSelector::Index(index)) => {
            if *index < names.len() {
                Ok(*index)
            } else {
                Err(Error::SheetOutOfBounds(*index, names.len()))
            }
        }
        Some(SheetSelector::Name(name)) => names
            .iter()
            .position(|n| n == name)
            .or_else(|| {
                let lower = name.to_lowercase();
                names.iter().position(|n| n.to_lowercase() == lower)
            })
            .ok_or_else(|| missing(name.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xlasso_core::{Workbook, Worksheet};

    fn book(id: &str, sheets: &[&str]) -> Arc<Workbook> {
        let mut wb = Workbook::new(id);
        for name in sheets {
            wb.add_worksheet(name).unwrap();
        }
        Arc::new(wb)
    }

    #[test]
    fn test_selectors() {
        let factory = SheetsFactory::new();
        factory.add_backend(book("main", &["Data", "Calc", "Summary"]));

        let name = |sel: SheetSelector| factory.get_sheet(None, Some(&sel)).unwrap().name().to_string();
        assert_eq!(name(SheetSelector::First), "Data");
        assert_eq!(name(SheetSelector::Last), "Summary");
        assert_eq!(name(SheetSelector::Index(1)), "Calc");
        assert_eq!(name(SheetSelector::Name("calc".into())), "Calc");

        assert!(matches!(
            factory.get_sheet(None, Some(&SheetSelector::Name("Nope".into()))),
            Err(Error::SheetNotFound(_))
        ));
        assert!(matches!(
            factory.get_sheet(None, Some(&SheetSelector::Index(3))),
            Err(Error::SheetOutOfBounds(3, 3))
        ));
    }

    #[test]
    fn test_serving_leaves_default_untouched() {
        let factory = SheetsFactory::new();
        factory.add_backend(book("main", &["Data", "Calc"]));

        // No default sheet: default backend's first sheet
        assert_eq!(factory.get_sheet(None, None).unwrap().name(), "Data");
        factory
            .get_sheet(None, Some(&SheetSelector::Name("Calc".into())))
            .unwrap();
        assert_eq!(factory.get_sheet(None, None).unwrap().name(), "Data");
        assert!(factory.default_sheet().is_none());
    }

    #[test]
    fn test_siblings_of_current_sheet() {
        let factory = SheetsFactory::new();
        factory.add_backend(book("main", &["Data", "Notes"]));
        factory.add_backend(book("other", &["Other", "Second"]));

        let other = factory.get_sheet(Some("other"), None).unwrap();
        let sibling = |selector: SheetSelector| {
            factory
                .fetch_sheet(None, Some(&selector), Some(&other))
                .unwrap()
                .id()
                .to_string()
        };
        assert_eq!(sibling(SheetSelector::Name("Second".into())), "[other]Second");
        assert_eq!(sibling(SheetSelector::Index(1)), "[other]Second");
        assert_eq!(sibling(SheetSelector::First), "[other]Other");

        // A bare request is the current sheet itself
        let bare = factory.fetch_sheet(None, None, Some(&other)).unwrap();
        assert_eq!(bare.id().to_string(), "[other]Other");

        // Sheets outside any registered backend fall back to the default one
        let loose: Arc<dyn Sheet> = Arc::new(Worksheet::new("Scratch"));
        let fallback = factory
            .fetch_sheet(None, Some(&SheetSelector::Index(1)), Some(&loose))
            .unwrap();
        assert_eq!(fallback.id().to_string(), "[main]Notes");
    }

    #[test]
    fn test_book_selection() {
        let factory = SheetsFactory::new();
        let main = book("main", &["Data"]);
        let other = book("other.csv", &["Other"]);
        factory.add_backend(main);
        factory.add_backend(other);

        assert_eq!(
            factory.get_sheet(Some("OTHER.csv"), None).unwrap().name(),
            "Other"
        );
        assert!(matches!(
            factory.get_sheet(Some("missing"), None),
            Err(Error::WorkbookNotFound(_))
        ));
        assert_eq!(
            factory.list_sheet_names(Some("main")).unwrap(),
            vec!["Data".to_string()]
        );
    }

    #[test]
    fn test_sheets_opened_once() {
        let factory = SheetsFactory::new();
        let wb = book("main", &["Data", "Calc"]);
        factory.add_backend(wb.clone());

        for _ in 0..5 {
            factory.get_sheet(None, Some(&SheetSelector::First)).unwrap();
        }
        factory.get_sheet(None, Some(&SheetSelector::Last)).unwrap();
        assert_eq!(wb.open_count(), 2);
        assert_eq!(factory.cached_count(), 2);

        factory.close();
        assert_eq!(factory.cached_count(), 0);
        assert!(factory.default_sheet().is_none());
        factory.get_sheet(None, Some(&SheetSelector::First)).unwrap();
        assert_eq!(wb.open_count(), 3);
    }

    #[test]
    fn test_standalone_sheets() {
        let factory = SheetsFactory::new();
        factory.add_sheet(Arc::new(Worksheet::new("Scratch")));
        factory.add_sheet(Arc::new(Worksheet::new("Notes")));

        assert_eq!(factory.get_sheet(None, None).unwrap().name(), "Notes");
        assert_eq!(
            factory
                .get_sheet(None, Some(&SheetSelector::Name("scratch".into())))
                .unwrap()
                .name(),
            "Scratch"
        );
        assert_eq!(
            factory.list_sheet_names(None).unwrap(),
            vec!["Scratch".to_string(), "Notes".to_string()]
        );
    }

    #[test]
    fn test_empty_factory() {
        let factory = SheetsFactory::new();
        assert!(matches!(factory.get_sheet(None, None), Err(Error::SheetNotFound(_))));
    }
}
