//! Reference resolution pipeline
//!
//! A [`Ranger`] parses a reference, fetches the sheet it names, resolves
//! the edges into a rectangle, reads the cells and runs the filter
//! pipeline over them. Filters such as `recurse` re-enter the ranger with a
//! nested [`LassoContext`]; its depth is what bounds recursion.

use std::sync::{Arc, RwLock};

use xlasso_core::{CellAddress, Sheet};

use crate::ast::LassoSpec;
use crate::error::{LassoError, LassoResult};
use crate::factory::SheetsFactory;
use crate::filters::{default_filters, FilterContext, FilterRegistry};
use crate::lasso::Lasso;
use crate::options::RangerOptions;
use crate::parser::parse_reference;
use crate::resolver::EdgeResolver;
use crate::value::Value;

/// Where a resolution happens: the sheet a bare reference refers to, the
/// cursor for relative coordinates, and how deeply nested it is
#[derive(Debug, Clone, Default)]
pub struct LassoContext {
    pub sheet: Option<Arc<dyn Sheet>>,
    pub cursor: Option<CellAddress>,
    pub depth: usize,
}

impl LassoContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sheet(mut self, sheet: Arc<dyn Sheet>) -> Self {
        self.sheet = Some(sheet);
        self
    }

    pub fn with_cursor(mut self, cursor: CellAddress) -> Self {
        self.cursor = Some(cursor);
        self
    }

    pub fn with_depth(mut self, depth: usize) -> Self {
        self.depth = depth;
        self
    }

    /// Context for a resolution started from inside this one
    pub fn nested(&self, sheet: Arc<dyn Sheet>, cursor: CellAddress) -> Self {
        Self {
            sheet: Some(sheet),
            cursor: Some(cursor),
            depth: self.depth + 1,
        }
    }
}

/// Resolves reference strings into [`Lasso`]s
///
/// # Example
/// ```rust
/// use xlasso::{Ranger, SheetsFactory, Workbook, Worksheet};
///
/// let sheet = Worksheet::from_rows("Sheet1", [[1, 2], [3, 4]]).unwrap();
/// let factory = SheetsFactory::new().with_backend(Workbook::new("book").with_worksheet(sheet).unwrap());
///
/// let lasso = Ranger::new(&factory).lasso("Sheet1!A1:B2").unwrap();
/// assert_eq!(lasso.rect().to_string(), "A1:B2");
/// assert_eq!(lasso.values().len(), 2);
/// ```
pub struct Ranger<'f> {
    factory: &'f SheetsFactory,
    filters: Arc<FilterRegistry>,
    options: RangerOptions,
    /// Last sheet this ranger served
    current: RwLock<Option<Arc<dyn Sheet>>>,
}

impl<'f> Ranger<'f> {
    /// A ranger over `factory` using the built-in filters
    pub fn new(factory: &'f SheetsFactory) -> Self {
        Self {
            factory,
            filters: default_filters(),
            options: RangerOptions::default(),
            current: RwLock::new(None),
        }
    }

    pub fn with_options(mut self, options: RangerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_filters(mut self, filters: Arc<FilterRegistry>) -> Self {
        self.filters = filters;
        self
    }

    pub fn options(&self) -> &RangerOptions {
        &self.options
    }

    pub fn factory(&self) -> &'f SheetsFactory {
        self.factory
    }

    pub fn filters(&self) -> &FilterRegistry {
        &self.filters
    }

    /// The sheet bare references resolve against, once one was served
    pub fn current_sheet(&self) -> Option<Arc<dyn Sheet>> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Resolve a top-level reference
    pub fn lasso(&self, reference: &str) -> LassoResult<Lasso> {
        self.resolve_lasso(reference, &LassoContext::default())
    }

    /// Resolve `reference` within `context`
    pub fn resolve_lasso(&self, reference: &str, context: &LassoContext) -> LassoResult<Lasso> {
        self.check_depth(reference, context)?;
        let spec = parse_reference(reference)?;
        log::debug!("parsed {:?} at depth {}", reference, context.depth);
        self.resolve_spec(spec, context)
    }

    /// Resolve an already parsed reference within `context`
    pub fn resolve_spec(&self, spec: LassoSpec, context: &LassoContext) -> LassoResult<Lasso> {
        self.check_depth(&spec.reference, context)?;

        let sheet = self.fetch_sheet(&spec, context)?;
        log::debug!("resolving {:?} on sheet {}", spec.reference, sheet.id());

        let resolver = EdgeResolver::new(sheet.as_ref(), &spec.reference);
        let cursor = context.cursor.unwrap_or(CellAddress::ORIGIN);
        let rect = resolver.resolve_rect(spec.start.as_ref(), spec.end.as_ref(), cursor)?;

        let values = sheet
            .read_rect(rect.rows(), rect.cols())
            .map_err(|source| LassoError::Backend {
                reference: spec.reference.clone(),
                source,
            })?;
        log::debug!("captured {} for {:?}", rect, spec.reference);

        let mut value = Value::from_rows(values.clone());
        {
            let cx = FilterContext::new(self, context, &spec, &sheet, rect);
            for call in &spec.filters {
                value = self.filters.invoke(call, value, &cx)?;
            }
        }

        Ok(Lasso::new(spec, sheet.id().clone(), rect, values, value))
    }

    fn check_depth(&self, reference: &str, context: &LassoContext) -> LassoResult<()> {
        if context.depth > self.options.max_depth {
            return Err(LassoError::RecursionLimit {
                reference: reference.to_string(),
                depth: context.depth,
                limit: self.options.max_depth,
                via: Vec::new(),
            });
        }
        Ok(())
    }

    fn fetch_sheet(&self, spec: &LassoSpec, context: &LassoContext) -> LassoResult<Arc<dyn Sheet>> {
        let current = context.sheet.clone().or_else(|| self.current_sheet());
        let sheet = self
            .factory
            .fetch_sheet(spec.book.as_deref(), spec.sheet.as_ref(), current.as_ref())
            .map_err(|e| LassoError::from_backend(&spec.reference, e))?;
        *self.current.write().unwrap_or_else(|e| e.into_inner()) = Some(sheet.clone());
        Ok(sheet)
    }
}

/// Resolve `reference` against `factory` with default options and return
/// the filtered value
pub fn lasso(reference: &str, factory: &SheetsFactory) -> LassoResult<Value> {
    Ranger::new(factory).lasso(reference).map(Lasso::into_value)
}
