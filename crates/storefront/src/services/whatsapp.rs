//! WhatsApp delivery message composer.
//!
//! Handing an account to a customer means sending its email plus two unused
//! verification codes with the download instructions for their console. The
//! two codes are then removed from the account and an audit report is
//! written. The three steps are independent: the message is returned even
//! when removing the codes fails, and the report is written in the
//! background with failures only logged.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use serde::Serialize;
use thiserror::Error;
use tracing::{info, instrument, warn};

use zona_gamer_core::{ItemId, ItemKind, MessagePlatform, Platform};

use crate::models::{AppUser, CodesUsed, CustomerInfo, EmailAccount, NewReport};
use crate::services::inventory::InventoryService;
use crate::services::reports::ReportService;
use crate::tasks::BackgroundTasks;

/// Codes consumed by one message.
pub const CODES_PER_MESSAGE: usize = 2;

const INSTRUCTIONS: &str = "Por favor sigue los pasos del siguiente video de Tiktok, recuerda seguirnos y guardar nuestro número en tus contactos";

/// Why a message could not be produced, or was produced only partly.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposeError {
    #[error("No hay suficientes códigos disponibles (se requieren al menos 2)")]
    NotEnoughCodes,

    #[error("No hay contraseña (código master) disponible")]
    MissingPassword,

    /// The message was generated but its codes are still on the account.
    #[error("El mensaje se generó pero hubo un error al eliminar los códigos")]
    CodesNotRemoved,
}

/// A rendered delivery message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WhatsAppMessage {
    pub correo: String,
    pub password: String,
    pub codigo_verificacion1: String,
    pub codigo_verificacion2: String,
    pub version: MessagePlatform,
    pub mensaje_completo: String,
}

/// Whether `account` still has enough codes for a message.
#[must_use]
pub fn has_enough_codes(account: &EmailAccount) -> bool {
    account.codigos_generados.len() >= CODES_PER_MESSAGE
}

/// Render the message for `account` using its first two codes.
///
/// `version` overrides the template picked from the account's platform;
/// accounts valid on both consoles get the PS4 template.
///
/// # Errors
///
/// Returns `ComposeError::NotEnoughCodes` with fewer than two codes and
/// `ComposeError::MissingPassword` when the master code is blank.
pub fn compose(
    account: &EmailAccount,
    version: Option<MessagePlatform>,
) -> Result<WhatsAppMessage, ComposeError> {
    let mut codes = account.codigos_generados.iter();
    let (Some(first), Some(second)) = (codes.next(), codes.next()) else {
        return Err(ComposeError::NotEnoughCodes);
    };
    if account.codigo_master.trim().is_empty() {
        return Err(ComposeError::MissingPassword);
    }

    let version = version.unwrap_or_else(|| MessagePlatform::for_platform(account.version));
    Ok(WhatsAppMessage {
        correo: account.email.clone(),
        password: account.codigo_master.clone(),
        codigo_verificacion1: first.clone(),
        codigo_verificacion2: second.clone(),
        version,
        mensaje_completo: render(&account.email, first, second, version),
    })
}

fn render(correo: &str, first: &str, second: &str, version: MessagePlatform) -> String {
    let (header, video) = match version {
        MessagePlatform::Ps4 => (
            "PASOS PARA DESCARGAR JUEGO DE PS4",
            "https://vm.tiktok.com/ZMSN4qThS/",
        ),
        MessagePlatform::Ps5 => (
            "PASOS PARA BAJAR UN JUEGO DE PS5",
            "https://vm.tiktok.com/ZMBx8613x/",
        ),
    };
    format!(
        "{header}\n\n{INSTRUCTIONS}\n\n{video}\n\nCORREO: {correo}\n\nCODIGO DE Verificacion: {first}\n\nCODIGO DE Verficacion de Respaldo: {second}"
    )
}

/// The account being handed out and where it lives.
#[derive(Debug, Clone)]
pub struct MessageRequest {
    pub kind: ItemKind,
    pub platform: Platform,
    pub item_id: ItemId,
    pub item_name: String,
    pub account: EmailAccount,
    /// Template to use instead of the one implied by the account's platform.
    pub version: Option<MessagePlatform>,
    pub cliente: CustomerInfo,
}

/// Generates messages, consumes their codes and records the audit report.
///
/// Keeps the last error message and a busy flag for the caller to show.
pub struct MessageComposer {
    games: Arc<InventoryService>,
    combos: Arc<InventoryService>,
    reports: Arc<ReportService>,
    tasks: BackgroundTasks,
    error: RwLock<Option<String>>,
    generating: AtomicBool,
}

impl std::fmt::Debug for MessageComposer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageComposer")
            .field("error", &self.error())
            .field("generating", &self.is_generating())
            .finish_non_exhaustive()
    }
}

impl MessageComposer {
    #[must_use]
    pub fn new(
        games: Arc<InventoryService>,
        combos: Arc<InventoryService>,
        reports: Arc<ReportService>,
        tasks: BackgroundTasks,
    ) -> Self {
        Self {
            games,
            combos,
            reports,
            tasks,
            error: RwLock::new(None),
            generating: AtomicBool::new(false),
        }
    }

    /// Message of the last failure, cleared when a new generation starts.
    #[must_use]
    pub fn error(&self) -> Option<String> {
        self.error.read().ok().and_then(|e| e.clone())
    }

    /// Whether codes are being removed right now.
    #[must_use]
    pub fn is_generating(&self) -> bool {
        self.generating.load(Ordering::SeqCst)
    }

    pub fn clear_error(&self) {
        self.set_error(None);
    }

    /// Render without touching the store, recording a validation failure as
    /// the current error.
    pub fn preview(
        &self,
        account: &EmailAccount,
        version: Option<MessagePlatform>,
    ) -> Option<WhatsAppMessage> {
        self.set_error(None);
        compose(account, version)
            .inspect_err(|e| self.set_error(Some(e.to_string())))
            .ok()
    }

    /// Generate the message, remove its two codes and queue the report.
    ///
    /// Returns `None` when the account fails validation; nothing is written
    /// in that case. A failed code removal sets the error but the message is
    /// still returned.
    #[instrument(
        skip(self, request, actor),
        fields(item = %request.item_id, correo = %request.account.email, uid = %actor.uid)
    )]
    pub async fn generate_and_consume(
        &self,
        request: MessageRequest,
        actor: &AppUser,
    ) -> Option<WhatsAppMessage> {
        let message = self.preview(&request.account, request.version)?;

        let codes = [
            message.codigo_verificacion1.clone(),
            message.codigo_verificacion2.clone(),
        ];
        self.generating.store(true, Ordering::SeqCst);
        let removed = self
            .inventory(request.kind)
            .remove_codes(request.platform, &request.item_id, &request.account.email, &codes)
            .await;
        self.generating.store(false, Ordering::SeqCst);

        if let Err(e) = removed {
            warn!(error = %e, "Message generated but codes were not removed");
            self.set_error(Some(ComposeError::CodesNotRemoved.to_string()));
        } else {
            info!(version = %message.version, "Message generated and codes consumed");
        }

        let report = NewReport {
            uid: actor.uid.clone(),
            email: Some(actor.email.clone()).filter(|e| !e.is_empty()),
            display_name: actor.display_name.clone(),
            rol: actor.role,
            tipo_item: request.kind,
            juego_nombre: request.item_name,
            juego_id: request.item_id.into_inner(),
            plataforma: request.platform,
            correo_utilizado: message.correo.clone(),
            codigos_usados: CodesUsed {
                codigo1: message.codigo_verificacion1.clone(),
                codigo2: message.codigo_verificacion2.clone(),
            },
            plataforma_mensaje: message.version,
            cliente: request.cliente,
        };
        let reports = Arc::clone(&self.reports);
        self.tasks.spawn("record_report", async move {
            reports.record(report).await.map(|_| ())
        });

        Some(message)
    }

    /// Forget the last error.
    pub fn reset(&self) {
        self.set_error(None);
        self.generating.store(false, Ordering::SeqCst);
    }

    fn inventory(&self, kind: ItemKind) -> &InventoryService {
        match kind {
            ItemKind::Game => &self.games,
            ItemKind::Combo => &self.combos,
        }
    }

    fn set_error(&self, message: Option<String>) {
        if let Ok(mut error) = self.error.write() {
            *error = message;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use chrono::{TimeZone, Utc};
    use rust_decimal::Decimal;
    use zona_gamer_core::{PriceQuad, UserRole, UserUid};

    use super::*;
    use crate::cache::CatalogCache;
    use crate::clock::ManualClock;
    use crate::db::InMemoryStore;
    use crate::models::{NewEmailAccount, ReportFilters};
    use crate::services::legacy::LegacyWriter;
    use crate::storage::MemoryStorage;

    fn account(codes: &[&str], master: &str, version: Platform) -> EmailAccount {
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
        EmailAccount {
            email: "cuenta1@zonagamer.com".into(),
            nombre: "Fifa 25".into(),
            precio: Decimal::new(20, 0),
            precios: PriceQuad::uniform(Decimal::new(20, 0)),
            costo: Decimal::new(20, 0),
            version,
            codigo_master: master.into(),
            codigos_generados: codes.iter().map(ToString::to_string).collect(),
            fecha: now,
            codigo: String::new(),
            cuentas: Vec::new(),
            saldo: None,
            created_at: now,
            updated_at: now,
            created_by: None,
        }
    }

    #[test]
    fn test_ps4_template() {
        let message = compose(&account(&["111", "222", "333"], "clave", Platform::Ps4), None).unwrap();

        assert_eq!(message.version, MessagePlatform::Ps4);
        assert_eq!(message.password, "clave");
        assert_eq!(
            message.mensaje_completo,
            "PASOS PARA DESCARGAR JUEGO DE PS4\n\n\
             Por favor sigue los pasos del siguiente video de Tiktok, recuerda seguirnos y guardar nuestro número en tus contactos\n\n\
             https://vm.tiktok.com/ZMSN4qThS/\n\n\
             CORREO: cuenta1@zonagamer.com\n\n\
             CODIGO DE Verificacion: 111\n\n\
             CODIGO DE Verficacion de Respaldo: 222"
        );
    }

    #[test]
    fn test_template_follows_platform_and_override() {
        let ps5 = account(&["1", "2"], "clave", Platform::Ps5);
        let message = compose(&ps5, None).unwrap();
        assert_eq!(message.version, MessagePlatform::Ps5);
        assert!(message.mensaje_completo.starts_with("PASOS PARA BAJAR UN JUEGO DE PS5"));
        assert!(message.mensaje_completo.contains("https://vm.tiktok.com/ZMBx8613x/"));

        let both = account(&["1", "2"], "clave", Platform::Ps4AndPs5);
        assert_eq!(compose(&both, None).unwrap().version, MessagePlatform::Ps4);
        assert_eq!(
            compose(&both, Some(MessagePlatform::Ps5)).unwrap().version,
            MessagePlatform::Ps5
        );
    }

    #[test]
    fn test_validation_errors() {
        assert_eq!(
            compose(&account(&["1"], "clave", Platform::Ps4), None),
            Err(ComposeError::NotEnoughCodes)
        );
        assert_eq!(
            compose(&account(&["1", "2"], "   ", Platform::Ps4), None),
            Err(ComposeError::MissingPassword)
        );
        assert_eq!(
            ComposeError::NotEnoughCodes.to_string(),
            "No hay suficientes códigos disponibles (se requieren al menos 2)"
        );
    }

    struct Fixture {
        store: Arc<InMemoryStore>,
        games: Arc<InventoryService>,
        reports: Arc<ReportService>,
        tasks: BackgroundTasks,
        composer: MessageComposer,
    }

    fn fixture() -> Fixture {
        let clock: Arc<ManualClock> = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let storage = Arc::new(MemoryStorage::new());
        let inventory = |kind| {
            Arc::new(InventoryService::new(
                store.clone(),
                CatalogCache::new(storage.clone(), clock.clone(), kind, Duration::from_secs(600)),
                clock.clone(),
                kind,
                LegacyWriter::new(true),
            ))
        };
        let games = inventory(ItemKind::Game);
        let combos = inventory(ItemKind::Combo);
        let reports = Arc::new(ReportService::new(store.clone(), clock.clone(), 100));
        let tasks = BackgroundTasks::new();
        let composer = MessageComposer::new(games.clone(), combos, reports.clone(), tasks.clone());
        Fixture {
            store,
            games,
            reports,
            tasks,
            composer,
        }
    }

    fn employee() -> AppUser {
        AppUser {
            uid: UserUid::new("emp-1"),
            email: "emp@zonagamer.com".into(),
            role: UserRole::Employee,
            display_name: Some("Empleado Uno".into()),
            created_at: Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap(),
            created_by: None,
        }
    }

    async fn seed(f: &Fixture, codes: &[&str]) -> EmailAccount {
        let id = ItemId::new("fifa_25");
        f.games
            .create_account(
                Platform::Ps4,
                &id,
                "cuenta1@zonagamer.com",
                NewEmailAccount {
                    precio: Some(Decimal::new(20, 0)),
                    codigo_master: Some("clave".into()),
                    codigos_generados: Some(codes.iter().map(ToString::to_string).collect()),
                    ..NewEmailAccount::default()
                },
            )
            .await
            .unwrap();
        f.games
            .get_account(Platform::Ps4, &id, "cuenta1@zonagamer.com")
            .await
            .unwrap()
            .unwrap()
    }

    fn request(account: EmailAccount) -> MessageRequest {
        MessageRequest {
            kind: ItemKind::Game,
            platform: Platform::Ps4,
            item_id: ItemId::new("fifa_25"),
            item_name: "Fifa 25".into(),
            account,
            version: None,
            cliente: CustomerInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_generate_consumes_codes_and_records_report() {
        let f = fixture();
        let account = seed(&f, &["111", "222", "333"]).await;

        let message = f
            .composer
            .generate_and_consume(request(account), &employee())
            .await
            .unwrap();
        assert_eq!(message.codigo_verificacion1, "111");
        assert!(f.composer.error().is_none());

        let left = f
            .games
            .get_account(Platform::Ps4, &ItemId::new("fifa_25"), "cuenta1@zonagamer.com")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(left.codigos_generados, vec!["333".to_string()]);

        f.tasks.wait_idle().await;
        let reports = f.reports.list(&ReportFilters::default(), None).await.unwrap();
        let report = reports.first().unwrap();
        assert_eq!(report.nombre_usuario, "Empleado Uno");
        assert_eq!(report.codigos_usados.codigo2, "222");
        assert_eq!(report.plataforma_mensaje, Some(MessagePlatform::Ps4));
    }

    #[tokio::test]
    async fn test_one_code_left_touches_nothing() {
        let f = fixture();
        let account = seed(&f, &["111"]).await;
        let documents = f.store.len();

        let result = f
            .composer
            .generate_and_consume(request(account), &employee())
            .await;

        assert!(result.is_none());
        assert_eq!(
            f.composer.error().as_deref(),
            Some("No hay suficientes códigos disponibles (se requieren al menos 2)")
        );
        assert_eq!(f.tasks.pending(), 0);
        assert_eq!(f.store.len(), documents);
    }

    #[tokio::test]
    async fn test_removal_failure_still_returns_message() {
        let f = fixture();
        let account = seed(&f, &["111", "222"]).await;
        f.store.fail_writes("correos");

        let message = f
            .composer
            .generate_and_consume(request(account), &employee())
            .await;

        assert!(message.is_some());
        assert_eq!(
            f.composer.error().as_deref(),
            Some("El mensaje se generó pero hubo un error al eliminar los códigos")
        );
        assert!(!f.composer.is_generating());
    }

    #[tokio::test]
    async fn test_report_failure_is_swallowed() {
        let f = fixture();
        let account = seed(&f, &["111", "222"]).await;
        f.store.fail_writes("reportes");

        let message = f
            .composer
            .generate_and_consume(request(account), &employee())
            .await;
        f.tasks.wait_idle().await;

        assert!(message.is_some());
        assert!(f.composer.error().is_none());
    }
}
