//! Formula evaluation engine
//!
//! The engine owns a [`Workbook`] and computes formula cells on demand.
//! Results are cached per [`CellId`] in the engine's [`EvaluationContext`];
//! reference cycles are detected through the in-flight stack and every
//! cell on the cycle evaluates to `#CIRCULAR!`.
//!
//! Before computing a cell the engine walks the static precedents of the
//! cell with an explicit work-list and computes them bottom-up, so long
//! chains such as `A2=A1+1, A3=A2+1, ...` never recurse more than one level.
//! The same walk catches cycles of direct references however long they are.

use crate::context::EvaluationContext;
use crate::options::EngineOptions;
use ahash::{AHashMap, AHashSet};
use log::{debug, trace};
use sheetcalc_core::{Cell, CellId, CellKind, Error, ErrorCode, Result, Value, Workbook};
use sheetcalc_formula::{
    evaluate_scalar, parse_formula, resolve, ComparisonOrder, EvaluationHost, Expr, FormulaError,
    FormulaResult, FunctionLibrary, FunctionRegistry, Resolved,
};
use std::fmt;
use std::sync::Arc;

/// Cumulative counters since the engine was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Calls of the public evaluation operations
    pub top_level_evaluations: u64,
    /// Formula cells whose tree was walked
    pub computations: u64,
    /// Formula cells answered from a cached result
    pub cache_hits: u64,
}

/// Evaluates the formula cells of one workbook
pub struct Engine {
    pub(crate) workbook: Workbook,
    pub(crate) context: EvaluationContext,
    library: Box<dyn FunctionLibrary>,
    pub(crate) options: EngineOptions,
    pub(crate) stats: EngineStats,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("sheets", &self.workbook.sheet_count())
            .field("cached_results", &self.context.len())
            .field("options", &self.options)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

impl Engine {
    /// Create an engine with default options and the built-in functions
    pub fn new(workbook: Workbook) -> Self {
        Self::with_options(workbook, EngineOptions::default())
    }

    pub fn with_options(workbook: Workbook, options: EngineOptions) -> Self {
        let mut engine = Self {
            workbook,
            context: EvaluationContext::new(),
            library: Box::new(FunctionRegistry::shared()),
            options,
            stats: EngineStats::default(),
        };
        engine.index_stored_results();
        engine
    }

    /// Create an engine that calls into `library` for every function
    pub fn with_library<L>(workbook: Workbook, library: L) -> Self
    where
        L: FunctionLibrary + 'static,
    {
        let mut engine = Self::new(workbook);
        engine.library = Box::new(library);
        engine
    }

    // === Accessors ===

    pub fn workbook(&self) -> &Workbook {
        &self.workbook
    }

    /// Mutable access to the workbook
    ///
    /// The engine does not see edits made this way; call
    /// [`Engine::clear_all`] or the targeted notifications afterwards.
    pub fn workbook_mut(&mut self) -> &mut Workbook {
        &mut self.workbook
    }

    pub fn into_workbook(self) -> Workbook {
        self.workbook
    }

    pub fn options(&self) -> &EngineOptions {
        &self.options
    }

    /// Replace the options; cached results are dropped
    pub fn set_options(&mut self, options: EngineOptions) {
        self.options = options;
        self.clear_all();
    }

    pub fn stats(&self) -> EngineStats {
        self.stats
    }

    pub fn context(&self) -> &EvaluationContext {
        &self.context
    }

    /// Whether a formula cell has a valid cached result
    pub fn is_cached(&self, cell: CellId) -> bool {
        self.context.cached(cell).is_some()
            || matches!(self.workbook.cell(cell), Ok(Some(c)) if c.cached_value().is_some())
    }

    // === Evaluation ===

    /// Value of a cell, computing and caching formula results as needed
    ///
    /// Never mutates the workbook.
    pub fn evaluate(&mut self, cell: CellId) -> Result<Value> {
        self.stats.top_level_evaluations += 1;
        if self.options.prefetch_dependencies {
            self.prefetch(cell);
        }
        let result = self.compute(cell);
        if result.is_err() {
            self.context.abandon();
        }
        result
    }

    /// Compute a formula cell and store the result in the cell
    ///
    /// The formula stays in place. Returns the kind of the result, or `None`
    /// for a cell that holds no formula, which is left untouched.
    pub fn evaluate_and_store(&mut self, cell: CellId) -> Result<Option<CellKind>> {
        if !self.is_formula(cell)? {
            return Ok(None);
        }
        let value = self.evaluate(cell)?;
        let kind = value.kind();
        self.workbook
            .sheet_for_cell_mut(cell)?
            .set_formula_result(cell.row, cell.col, value)?;
        Ok(Some(kind))
    }

    /// Alias of [`Engine::evaluate_and_store`]
    pub fn evaluate_formula_cell(&mut self, cell: CellId) -> Result<Option<CellKind>> {
        self.evaluate_and_store(cell)
    }

    /// Compute a formula cell and replace the formula with its result
    ///
    /// A cell holding no formula is returned unchanged.
    pub fn evaluate_and_replace(&mut self, cell: CellId) -> Result<Value> {
        if !self.is_formula(cell)? {
            return self.evaluate(cell);
        }
        let value = self.evaluate(cell)?;
        self.workbook
            .sheet_for_cell_mut(cell)?
            .set_cell_at(cell.row, cell.col, Cell::Plain(value.clone()))?;
        // Dependents saw this same value, so their results stay valid
        self.context.forget_formula(cell);
        Ok(value)
    }

    /// Alias of [`Engine::evaluate_and_replace`]
    pub fn evaluate_in_cell(&mut self, cell: CellId) -> Result<Value> {
        self.evaluate_and_replace(cell)
    }

    /// Evaluate an expression as if it were the formula at `position`
    ///
    /// Cells it references are computed and cached as usual; the result of
    /// the expression itself is not cached anywhere.
    pub fn evaluate_expr(&mut self, expr: &Expr, position: CellId) -> Result<Value> {
        self.stats.top_level_evaluations += 1;
        self.workbook.cell(position)?;
        let result = evaluate_scalar(expr, position, &mut Reentry(self)).map_err(Error::from);
        if result.is_err() {
            self.context.abandon();
        }
        result.map(finish)
    }

    /// Parse and evaluate formula text at `position` without storing it
    pub fn evaluate_formula(&mut self, formula: &str, position: CellId) -> Result<Value> {
        let expr = parse_formula(formula)?;
        self.evaluate_expr(&expr, position)
    }

    fn is_formula(&self, cell: CellId) -> Result<bool> {
        Ok(self.workbook.cell(cell)?.map_or(false, Cell::is_formula))
    }

    /// Value of one cell, re-entered for every reference
    fn compute(&mut self, cell: CellId) -> Result<Value> {
        let stored = match self.workbook.cell(cell)? {
            None => return Ok(Value::Blank),
            Some(Cell::Plain(value)) => return Ok(value.clone()),
            Some(Cell::Formula(formula)) => formula.cached_value().cloned(),
        };

        if let Some(value) = self.context.cached(cell) {
            trace!("cache hit for {}", cell);
            self.stats.cache_hits += 1;
            return Ok(value.clone());
        }

        if self.context.is_in_flight(cell) {
            let members = self.context.mark_cycle(cell);
            debug!("circular reference through {} spanning {} cells", cell, members);
            return Ok(Value::Error(ErrorCode::CircularReference));
        }

        let expr = self.parsed(cell)?;

        if let Some(value) = stored {
            trace!("using stored result of {}", cell);
            self.stats.cache_hits += 1;
            self.context.store(cell, value.clone());
            return Ok(value);
        }

        if self.context.depth() >= self.options.max_depth {
            return Err(Error::RecursionLimit(self.options.max_depth));
        }

        debug!("computing {}", cell);
        self.context.push(cell);
        let result = evaluate_scalar(&expr, cell, &mut Reentry(self));
        self.context.pop(cell);
        let mut value = finish(result?);

        if self.context.take_cyclic(cell) {
            value = Value::Error(ErrorCode::CircularReference);
        }
        self.stats.computations += 1;
        self.context.store(cell, value.clone());
        Ok(value)
    }

    /// Parsed tree of a formula cell, parsing and indexing it on first use
    pub(crate) fn parsed(&mut self, cell: CellId) -> Result<Arc<Expr>> {
        if let Some(expr) = self.context.parsed(cell) {
            return Ok(expr);
        }
        let expr = match self.workbook.cell(cell)? {
            Some(Cell::Formula(formula)) => Arc::new(parse_formula(formula.text())?),
            Some(other) => {
                return Err(Error::UnsupportedCellKind {
                    operation: "parse formula",
                    kind: other.kind(),
                })
            }
            None => {
                return Err(Error::UnsupportedCellKind {
                    operation: "parse formula",
                    kind: CellKind::Blank,
                })
            }
        };
        self.context
            .insert_parsed(cell, Arc::clone(&expr), &self.workbook);
        Ok(expr)
    }

    /// Index formulas that arrive with a valid stored result
    ///
    /// Those results are served without computing, so their references
    /// must be known for invalidation to reach them.
    fn index_stored_results(&mut self) {
        let stored: Vec<CellId> = self
            .workbook
            .sheets()
            .flat_map(|sheet| {
                let id = sheet.id();
                sheet
                    .iter_cells()
                    .filter(|(_, _, cell)| cell.cached_value().is_some())
                    .map(move |(row, col, _)| CellId::new(id, row, col))
            })
            .collect();

        for cell in stored {
            if let Err(e) = self.parsed(cell) {
                debug!("dropping stored result of {}: {}", cell, e);
                if let Ok(sheet) = self.workbook.sheet_for_cell_mut(cell) {
                    if let Some(c) = sheet.cell_at_mut(cell.row, cell.col) {
                        c.invalidate();
                    }
                }
            }
        }
    }

    // === Prefetch ===

    /// Compute the uncached formula precedents of `root`, deepest first
    ///
    /// Failures are left for the real evaluation to report, since
    /// implicit intersection may never read a cell prefetched here.
    fn prefetch(&mut self, root: CellId) {
        if self.context.depth() > 0
            || self.is_cached(root)
            || !matches!(self.is_formula(root), Ok(true))
        {
            return;
        }
        let order = self.precedent_order(root);
        trace!("prefetching {} precedents of {}", order.len(), root);
        for cell in order {
            if let Err(e) = self.compute(cell) {
                trace!("prefetch of {} failed: {}", cell, e);
                self.context.abandon();
            }
        }
    }

    /// Uncached formula cells `root` depends on, in post-order, `root` excluded
    ///
    /// A direct reference back to a cell still on the walk's path closes a
    /// cycle, and every cell on that stretch of the path is stored as
    /// `#CIRCULAR!` before anything is computed. Cycles longer than the
    /// depth limit are caught this way. An edge through a range may be
    /// narrowed by implicit intersection, so it never closes a cycle here.
    fn precedent_order(&mut self, root: CellId) -> Vec<CellId> {
        let mut order = Vec::new();
        let mut visited = AHashSet::new();
        let mut cyclic = AHashSet::new();
        // Cells being expanded, each with whether it was reached directly
        let mut path: Vec<(CellId, bool)> = Vec::new();
        let mut on_path: AHashMap<CellId, usize> = AHashMap::new();
        let mut stack = vec![(root, true, false)];

        while let Some((cell, direct, expanded)) = stack.pop() {
            if expanded {
                path.pop();
                on_path.remove(&cell);
                if cell != root && !cyclic.contains(&cell) {
                    order.push(cell);
                }
                continue;
            }
            // A cell reached again after expansion is already ordered or on a cycle
            if !visited.insert(cell) {
                continue;
            }
            on_path.insert(cell, path.len());
            path.push((cell, direct));
            stack.push((cell, direct, true));

            for (precedent, direct_ref) in self.formula_precedents(cell) {
                if let Some(&start) = on_path.get(&precedent) {
                    if direct_ref && path[start + 1..].iter().all(|&(_, d)| d) {
                        cyclic.extend(path[start..].iter().map(|&(c, _)| c));
                    }
                } else if !visited.contains(&precedent) && !self.is_cached(precedent) {
                    stack.push((precedent, direct_ref, false));
                }
            }
        }

        if !cyclic.is_empty() {
            debug!("{} cells on reference cycles reachable from {}", cyclic.len(), root);
            for cell in cyclic {
                self.context
                    .store(cell, Value::Error(ErrorCode::CircularReference));
            }
        }
        order
    }

    /// Formula cells referenced by the formula at `cell`
    ///
    /// Each comes with whether it is referenced directly rather than
    /// through a range.
    fn formula_precedents(&mut self, cell: CellId) -> Vec<(CellId, bool)> {
        let expr = match self.parsed(cell) {
            Ok(expr) => expr,
            Err(_) => return Vec::new(),
        };

        let mut found = Vec::new();
        for token in expr.references() {
            match resolve(token, cell.sheet, &self.workbook) {
                Ok(Resolved::Cell(id)) => {
                    if matches!(self.workbook.cell(id), Ok(Some(c)) if c.is_formula()) {
                        found.push((id, true));
                    }
                }
                Ok(Resolved::Range(range)) => {
                    for &sheet_id in range.sheets() {
                        if let Some(sheet) = self.workbook.sheet_by_id(sheet_id) {
                            found.extend(
                                sheet
                                    .cells_in(range.range())
                                    .filter(|(_, _, c)| c.is_formula())
                                    .map(|(row, col, _)| (CellId::new(sheet_id, row, col), false)),
                            );
                        }
                    }
                }
                Err(_) => {}
            }
        }
        found
    }
}

/// A blank formula result reads as zero
fn finish(value: Value) -> Value {
    match value {
        Value::Blank => Value::Number(0.0),
        other => other,
    }
}

/// The engine as seen by the tree evaluator while computing a cell
struct Reentry<'a>(&'a mut Engine);

impl EvaluationHost for Reentry<'_> {
    fn workbook(&self) -> &Workbook {
        &self.0.workbook
    }

    fn functions(&self) -> &dyn FunctionLibrary {
        self.0.library.as_ref()
    }

    fn comparison(&self) -> ComparisonOrder {
        self.0.options.comparison
    }

    fn cell_value(&mut self, cell: CellId) -> FormulaResult<Value> {
        self.0.compute(cell).map_err(FormulaError::Core)
    }
}
