//! Sales ledger: review diffs, form validation and the pending-approval
//! workflow.
pub mod diff;
pub mod filtro;
pub mod validacion;
pub mod workflow;

pub use diff::{diff_venta, revision_de, CambioCampo, Revision};
pub use filtro::{FiltroLibro, OpcionesFiltro, Produccion};
pub use validacion::ValidationError;
pub use workflow::{LibroVentas, WriteOutcome};
