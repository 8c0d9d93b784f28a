//! Filter registry and built-in filters
//!
//! A filter is a plain function from a captured [`Value`] to a new one.
//! Filters are looked up by case-insensitive name in a [`FilterRegistry`];
//! the registry checks arity, and wraps or swallows failures according to
//! the ranger's [`RangerOptions`].

mod builtin;
mod eval;
mod recurse;

use std::borrow::Cow;
use std::fmt;
use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use once_cell::sync::Lazy;
use xlasso_core::{CellAddress, Sheet};

use crate::ast::{FilterCall, LassoSpec};
use crate::error::{LassoError, LassoResult};
use crate::options::RangerOptions;
use crate::ranger::{LassoContext, Ranger};
use crate::resolver::ResolvedRect;
use crate::value::Value;

/// Filter implementation signature
///
/// Filters receive the value produced by the previous stage, the call with
/// its literal arguments, and the context of the resolution they run in.
pub type FilterImpl = fn(Value, &FilterCall, &FilterContext<'_>) -> LassoResult<Value>;

/// Filter definition
#[derive(Clone)]
pub struct FilterDef {
    /// Filter name (matched case-insensitively)
    pub name: Cow<'static, str>,
    /// Minimum positional arguments
    pub min_args: usize,
    /// Maximum positional arguments (None = unlimited)
    pub max_args: Option<usize>,
    /// Implementation
    pub implementation: FilterImpl,
    /// One-line usage, shown in verbose errors
    pub description: Cow<'static, str>,
}

impl fmt::Debug for FilterDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FilterDef")
            .field("name", &self.name)
            .field("min_args", &self.min_args)
            .field("max_args", &self.max_args)
            .finish_non_exhaustive()
    }
}

/// Filter registry
#[derive(Debug)]
pub struct FilterRegistry {
    filters: RwLock<AHashMap<String, Arc<FilterDef>>>,
}

/// Shared registry of built-in filters (lazily initialized)
static DEFAULT_FILTERS: Lazy<Arc<FilterRegistry>> = Lazy::new(|| Arc::new(FilterRegistry::new()));

/// The process-wide registry holding the built-in filters
pub fn default_filters() -> Arc<FilterRegistry> {
    DEFAULT_FILTERS.clone()
}

impl FilterRegistry {
    /// Create a new registry with all built-in filters
    pub fn new() -> Self {
        let registry = Self::empty();
        builtin::register_builtin_filters(&registry);
        registry.register(FilterDef {
            name: "eval".into(),
            min_args: 1,
            max_args: Some(1),
            implementation: eval::filter_eval,
            description: "eval(expr): evaluate an expression with the value bound to x".into(),
        });
        registry.register(FilterDef {
            name: "recurse".into(),
            min_args: 0,
            max_args: Some(4),
            implementation: recurse::filter_recurse,
            description: "recurse(ref=null, include=null, exclude=null, depth=-1): lasso ref, or every \
                          string cell that parses as a reference"
                .into(),
        });
        registry
    }

    /// Create a registry without any filters
    pub fn empty() -> Self {
        Self {
            filters: RwLock::new(AHashMap::new()),
        }
    }

    /// Register a filter, returning the definition it replaces
    pub fn register(&self, def: FilterDef) -> Option<Arc<FilterDef>> {
        self.filters
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(def.name.to_lowercase(), Arc::new(def))
    }

    /// Look up a filter by name
    pub fn get(&self, name: &str) -> Option<Arc<FilterDef>> {
        self.filters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(&name.to_lowercase())
            .cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    /// Registered filter names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .filters
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Apply `call` to `value`
    ///
    /// Unknown names and recursion-limit failures always propagate as they
    /// are. Other failures are wrapped with the call text, or logged and
    /// ignored in lax mode.
    pub fn invoke(
        &self,
        call: &FilterCall,
        value: Value,
        cx: &FilterContext<'_>,
    ) -> LassoResult<Value> {
        let def = self
            .get(&call.name)
            .ok_or_else(|| LassoError::UnknownFilter {
                reference: cx.reference().to_string(),
                name: call.name.clone(),
                via: Vec::new(),
            })?;

        let fallback = cx.options().lax.then(|| value.clone());
        let result = check_arity(&def, call).and_then(|()| (def.implementation)(value, call, cx));

        match result {
            Ok(value) => {
                log::debug!("applied filter {} in {:?}", call, cx.reference());
                Ok(value)
            }
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => match fallback {
                Some(original) => {
                    log::warn!(
                        "filter {} failed in {:?}, passing value through: {}",
                        call,
                        cx.reference(),
                        e
                    );
                    Ok(original)
                }
                None => Err(LassoError::Filter {
                    reference: cx.reference().to_string(),
                    call: call.to_string(),
                    source: Box::new(e),
                    help: if cx.options().verbose {
                        format!("\n  usage: {}", def.description)
                    } else {
                        String::new()
                    },
                }),
            },
        }
    }
}

impl Default for FilterRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn check_arity(def: &FilterDef, call: &FilterCall) -> LassoResult<()> {
    let count = call.args.len();
    if count < def.min_args {
        return Err(LassoError::argument(
            def.name.as_ref(),
            format!("expected at least {} arguments, got {}", def.min_args, count),
        ));
    }
    if let Some(max) = def.max_args {
        if count > max {
            return Err(LassoError::argument(
                def.name.as_ref(),
                format!("expected at most {} arguments, got {}", max, count),
            ));
        }
    }
    Ok(())
}

/// What a filter can see of the resolution it runs in
pub struct FilterContext<'a> {
    ranger: &'a Ranger<'a>,
    context: &'a LassoContext,
    spec: &'a LassoSpec,
    sheet: &'a Arc<dyn Sheet>,
    rect: ResolvedRect,
}

impl<'a> FilterContext<'a> {
    pub(crate) fn new(
        ranger: &'a Ranger<'a>,
        context: &'a LassoContext,
        spec: &'a LassoSpec,
        sheet: &'a Arc<dyn Sheet>,
        rect: ResolvedRect,
    ) -> Self {
        Self {
            ranger,
            context,
            spec,
            sheet,
            rect,
        }
    }

    pub fn ranger(&self) -> &'a Ranger<'a> {
        self.ranger
    }

    pub fn context(&self) -> &LassoContext {
        self.context
    }

    pub fn spec(&self) -> &LassoSpec {
        self.spec
    }

    pub fn sheet(&self) -> &Arc<dyn Sheet> {
        self.sheet
    }

    /// The captured rectangle
    pub fn rect(&self) -> ResolvedRect {
        self.rect
    }

    pub fn reference(&self) -> &str {
        &self.spec.reference
    }

    pub fn options(&self) -> &RangerOptions {
        self.ranger.options()
    }

    /// Context for a nested resolution on this sheet, anchored at `cursor`
    pub fn nested(&self, cursor: CellAddress) -> LassoContext {
        self.context.nested(self.sheet.clone(), cursor)
    }

    /// Apply another filter call in this context
    pub fn apply(&self, call: &FilterCall, value: Value) -> LassoResult<Value> {
        self.ranger.filters().invoke(call, value, self)
    }

    /// Shape of the capture: 0 scalar (start edge only), 1 single cell,
    /// 2 single row, 3 single column, 4 table
    pub fn shape_index(&self) -> usize {
        let single_cell = self.rect.height() == 1 && self.rect.width() == 1;
        if self.spec.end.is_none() && single_cell {
            0
        } else if single_cell {
            1
        } else if self.rect.height() == 1 {
            2
        } else if self.rect.width() == 1 {
            3
        } else {
            4
        }
    }
}
