//! Message generation audit log (`reportes`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use zona_gamer_core::{
    AccountTier, ItemKind, MessagePlatform, Platform, ReportId, UserRole, UserUid,
};

use super::{lenient, lenient_or_default, opt_text, text};

/// The two verification codes handed out in one message.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodesUsed {
    #[serde(default, deserialize_with = "text")]
    pub codigo1: String,
    #[serde(default, deserialize_with = "text")]
    pub codigo2: String,
}

/// Customer details attached to a report after the fact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cliente_nombre: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cliente_telefono: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tipo_cuenta: Option<AccountTier>,
}

/// A stored report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Report {
    #[serde(default)]
    pub id: ReportId,
    #[serde(default)]
    pub uid: UserUid,
    #[serde(default, deserialize_with = "text")]
    pub email: String,
    #[serde(default, deserialize_with = "text")]
    pub nombre_usuario: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub rol: UserRole,
    #[serde(default, deserialize_with = "lenient")]
    pub tipo_item: Option<ItemKind>,
    #[serde(default, deserialize_with = "text")]
    pub juego_nombre: String,
    #[serde(default, deserialize_with = "text")]
    pub juego_id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub plataforma: Option<Platform>,
    #[serde(default, deserialize_with = "text")]
    pub correo_utilizado: String,
    #[serde(default, deserialize_with = "lenient_or_default")]
    pub codigos_usados: CodesUsed,
    #[serde(default, deserialize_with = "lenient")]
    pub plataforma_mensaje: Option<MessagePlatform>,
    #[serde(default, deserialize_with = "opt_text")]
    pub cliente_nombre: Option<String>,
    #[serde(default, deserialize_with = "opt_text")]
    pub cliente_telefono: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub tipo_cuenta: Option<AccountTier>,
    /// Null until the server timestamp of a fresh write is read back.
    #[serde(default, deserialize_with = "lenient")]
    pub fecha_generacion: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "lenient")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// A report about to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReport {
    pub uid: UserUid,
    pub email: Option<String>,
    /// Display name of the employee; falls back to the email.
    pub display_name: Option<String>,
    pub rol: UserRole,
    pub tipo_item: ItemKind,
    pub juego_nombre: String,
    pub juego_id: String,
    pub plataforma: Platform,
    pub correo_utilizado: String,
    pub codigos_usados: CodesUsed,
    pub plataforma_mensaje: MessagePlatform,
    pub cliente: CustomerInfo,
}

/// Filters for [`ReportService::list`](crate::services::reports::ReportService::list).
///
/// `uid` (or else `rol`) is applied by the store; the rest is applied to the
/// fetched page.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReportFilters {
    pub uid: Option<UserUid>,
    pub rol: Option<UserRole>,
    pub fecha_inicio: Option<DateTime<Utc>>,
    pub fecha_fin: Option<DateTime<Utc>>,
    pub plataforma: Option<Platform>,
    pub tipo_item: Option<ItemKind>,
    /// Case-insensitive free text.
    pub busqueda: Option<String>,
}

/// Counts over the loaded reports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub total: usize,
    /// Keyed by uid.
    pub por_usuario: BTreeMap<String, usize>,
    /// Keyed by message platform (`PS4`, `PS5`).
    pub por_plataforma: BTreeMap<String, usize>,
    /// Keyed by role.
    pub por_rol: BTreeMap<String, usize>,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_report_reads_partial_document() {
        let report: Report = serde_json::from_value(serde_json::json!({
            "uid": "u1",
            "rol": "supervisor",
            "plataformaMensaje": "PS5",
            "codigosUsados": {"codigo1": "111", "codigo2": 222},
        }))
        .unwrap();

        assert_eq!(report.rol, UserRole::Client);
        assert_eq!(report.plataforma_mensaje, Some(MessagePlatform::Ps5));
        assert_eq!(report.codigos_usados.codigo2, "222");
        assert!(report.fecha_generacion.is_none());
    }
}
