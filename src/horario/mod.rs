//! Employee time tracking: daily targets and balances, calendar
//! reconciliation, the clock-in ticker, history summaries and the admin
//! schedule marks.
pub mod balance;
pub mod calendario;
pub mod historial;
pub mod marca;
pub mod reloj;

pub use balance::{balance_dia, formatear_balance, formatear_minutos, objetivo_dia};
pub use calendario::{clasificar_dia, reconciliar, ClaseDia, TotalesMes};
pub use historial::{resumen_semanal, ResumenSemana};
pub use marca::{FichajesManuales, MarcaDia};
pub use reloj::{saludo, Aviso, SesionFichaje};
