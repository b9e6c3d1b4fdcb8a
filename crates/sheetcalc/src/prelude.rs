//! Prelude module - common imports for sheetcalc users
//!
//! ```rust
//! use sheetcalc::prelude::*;
//! ```

pub use crate::{
    // Cell types
    Cell,
    CellAddress,
    CellId,
    CellKind,
    CellRange,
    // Engine types
    Engine,
    EngineOptions,
    // Error types
    Error,
    ErrorCode,
    EvaluationStats,
    InvalidationPolicy,
    Result,
    Sheet,
    SheetId,
    Value,
    // Main types
    Workbook,
    // Extension traits
    WorkbookCalculationExt,
};
