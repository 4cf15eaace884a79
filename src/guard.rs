//! Screen access rules.
//!
//! Admins go anywhere once signed in. Employees reach the CRM screens only
//! from a desktop, while clocked in, and if their shift was not closed
//! remotely; anything else sends them back to the clock-in screen.
use std::fmt;

use crate::model::User;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ruta {
    Login,
    ControlHorario,
    Calendario,
    Historial,
    LibroVentas,
    NuevaVenta,
    HorarioCrm,
    CrearUsuario,
}

impl Ruta {
    pub fn path(&self) -> &'static str {
        match self {
            Ruta::Login => "/login",
            Ruta::ControlHorario => "/control-horario",
            Ruta::Calendario => "/calendario",
            Ruta::Historial => "/historial",
            Ruta::LibroVentas => "/crm/libro-ventas",
            Ruta::NuevaVenta => "/crm/nueva-venta",
            Ruta::HorarioCrm => "/crm/horario",
            Ruta::CrearUsuario => "/crm/usuarios/nuevo",
        }
    }

    /// Screens under `/crm`.
    pub fn es_crm(&self) -> bool {
        self.path().starts_with("/crm")
    }

    pub fn solo_admin(&self) -> bool {
        matches!(self, Ruta::HorarioCrm | Ruta::CrearUsuario)
    }

    pub fn publica(&self) -> bool {
        matches!(self, Ruta::Login)
    }
}

impl fmt::Display for Ruta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Device and shift facts the guard needs besides the user.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextoAcceso {
    pub movil: bool,
    pub jornada_cerrada: bool,
    pub dentro: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acceso {
    Permitido,
    Redirigir(Ruta),
}

pub fn resolver_acceso(user: Option<&User>, ruta: Ruta, ctx: ContextoAcceso) -> Acceso {
    if ruta.publica() {
        return Acceso::Permitido;
    }
    let Some(user) = user else {
        return Acceso::Redirigir(Ruta::Login);
    };
    if user.is_admin() {
        return Acceso::Permitido;
    }
    if ruta.solo_admin() {
        return Acceso::Redirigir(Ruta::ControlHorario);
    }
    if ruta.es_crm() && (ctx.movil || ctx.jornada_cerrada || !ctx.dentro) {
        return Acceso::Redirigir(Ruta::ControlHorario);
    }
    Acceso::Permitido
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Role;

    fn user(role: Role) -> User {
        User {
            id: "u1".into(),
            role,
            nombre: "Ana".into(),
        }
    }

    const DENTRO: ContextoAcceso = ContextoAcceso {
        movil: false,
        jornada_cerrada: false,
        dentro: true,
    };

    #[test]
    fn anonymous_users_go_to_login() {
        assert_eq!(
            resolver_acceso(None, Ruta::LibroVentas, DENTRO),
            Acceso::Redirigir(Ruta::Login)
        );
        assert_eq!(
            resolver_acceso(None, Ruta::ControlHorario, DENTRO),
            Acceso::Redirigir(Ruta::Login)
        );
        assert_eq!(resolver_acceso(None, Ruta::Login, DENTRO), Acceso::Permitido);
    }

    #[test]
    fn admins_pass_regardless_of_device() {
        let admin = user(Role::Admin);
        let ctx = ContextoAcceso {
            movil: true,
            jornada_cerrada: true,
            dentro: false,
        };
        for ruta in [Ruta::LibroVentas, Ruta::HorarioCrm, Ruta::CrearUsuario] {
            assert_eq!(resolver_acceso(Some(&admin), ruta, ctx), Acceso::Permitido);
        }
    }

    #[test]
    fn employee_crm_access_needs_open_shift_on_desktop() {
        let emp = user(Role::Empleado);
        assert_eq!(
            resolver_acceso(Some(&emp), Ruta::LibroVentas, DENTRO),
            Acceso::Permitido
        );

        let redirect = Acceso::Redirigir(Ruta::ControlHorario);
        for ctx in [
            ContextoAcceso { movil: true, ..DENTRO },
            ContextoAcceso { jornada_cerrada: true, ..DENTRO },
            ContextoAcceso { dentro: false, ..DENTRO },
        ] {
            assert_eq!(resolver_acceso(Some(&emp), Ruta::NuevaVenta, ctx), redirect);
        }
    }

    #[test]
    fn employee_screens_outside_crm_stay_open() {
        let emp = user(Role::Empleado);
        let ctx = ContextoAcceso {
            movil: true,
            jornada_cerrada: true,
            dentro: false,
        };
        assert_eq!(
            resolver_acceso(Some(&emp), Ruta::Calendario, ctx),
            Acceso::Permitido
        );
        assert_eq!(
            resolver_acceso(Some(&emp), Ruta::HorarioCrm, DENTRO),
            Acceso::Redirigir(Ruta::ControlHorario)
        );
    }
}
