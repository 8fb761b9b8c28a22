//! Audit log of generated WhatsApp messages.
//!
//! Every message an employee generates is recorded in `reportes`, with the
//! codes it handed out and, optionally, the customer it was sent to. Admins
//! load pages of reports with [`ReportService::list`] and read counters from
//! the loaded page with [`ReportService::stats`].

use std::sync::{Arc, RwLock};

use tracing::{error, info, instrument};

use zona_gamer_core::ReportId;

use crate::clock::Clock;
use crate::db::{DocumentStore, Fields, Query, ReportRepository, Value, sparse};
use crate::error::Result;
use crate::models::{CustomerInfo, NewReport, Report, ReportFilters, ReportStats};

const FALLBACK_USER_NAME: &str = "Usuario";

/// Report writer and loader.
pub struct ReportService {
    store: Arc<dyn DocumentStore>,
    clock: Arc<dyn Clock>,
    default_limit: usize,
    loaded: RwLock<Vec<Report>>,
}

impl std::fmt::Debug for ReportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportService")
            .field("default_limit", &self.default_limit)
            .field("loaded", &self.reports().len())
            .finish_non_exhaustive()
    }
}

impl ReportService {
    #[must_use]
    pub fn new(store: Arc<dyn DocumentStore>, clock: Arc<dyn Clock>, default_limit: usize) -> Self {
        Self {
            store,
            clock,
            default_limit,
            loaded: RwLock::new(Vec::new()),
        }
    }

    fn repo(&self) -> ReportRepository<'_> {
        ReportRepository::new(self.store.as_ref())
    }

    /// Append a report. Generation and creation times are set by the store.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the write fails.
    #[instrument(skip(self, report), fields(uid = %report.uid, juego = %report.juego_id))]
    pub async fn record(&self, report: NewReport) -> Result<ReportId> {
        let nombre_usuario = [report.display_name.as_deref(), report.email.as_deref()]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .unwrap_or(FALLBACK_USER_NAME)
            .to_owned();

        let mut codes = Fields::new();
        codes.insert("codigo1".into(), Value::from(report.codigos_usados.codigo1));
        codes.insert("codigo2".into(), Value::from(report.codigos_usados.codigo2));

        let mut fields = Fields::new();
        fields.insert("uid".into(), Value::from(report.uid.into_inner()));
        if let Some(email) = report.email {
            fields.insert("email".into(), Value::from(email));
        }
        fields.insert("nombreUsuario".into(), Value::from(nombre_usuario));
        fields.insert("rol".into(), Value::from(report.rol.as_str()));
        fields.insert("tipoItem".into(), Value::from(report.tipo_item.as_str()));
        fields.insert("juegoNombre".into(), Value::from(report.juego_nombre));
        fields.insert("juegoId".into(), Value::from(report.juego_id));
        fields.insert("plataforma".into(), Value::from(report.plataforma.as_str()));
        fields.insert("correoUtilizado".into(), Value::from(report.correo_utilizado));
        fields.insert("codigosUsados".into(), Value::Map(codes));
        fields.insert(
            "plataformaMensaje".into(),
            Value::from(report.plataforma_mensaje.as_str()),
        );
        put_customer(&mut fields, report.cliente);
        fields.insert("fechaGeneracion".into(), Value::ServerTimestamp);
        fields.insert("createdAt".into(), Value::ServerTimestamp);

        let id = self
            .repo()
            .add(sparse(fields))
            .await
            .inspect_err(|e| error!(error = %e, "Failed to record report"))?;

        info!(report = %id, "Report recorded");
        Ok(id)
    }

    /// Attach customer details to an existing report.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the report does not exist or the
    /// security rules reject the update.
    #[instrument(skip(self, cliente))]
    pub async fn amend(&self, id: &ReportId, cliente: CustomerInfo) -> Result<()> {
        let mut fields = Fields::new();
        put_customer(&mut fields, cliente);
        fields.insert("updatedAt".into(), Value::Timestamp(self.clock.now()));

        self.repo()
            .update(id, sparse(fields))
            .await
            .inspect_err(|e| error!(report = %id, error = %e, "Failed to amend report"))?;
        Ok(())
    }

    /// Load the newest reports matching `filters` and keep them as the
    /// loaded page.
    ///
    /// `uid` (or else `rol`) narrows the store query; the date range,
    /// platform, item kind and free-text filters apply to the fetched page,
    /// so fewer than `limit` reports may come back.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Database` if the query fails. The loaded page is
    /// left unchanged in that case.
    #[instrument(skip(self, filters))]
    pub async fn list(&self, filters: &ReportFilters, limit: Option<usize>) -> Result<Vec<Report>> {
        let mut query = Query::new()
            .order_by_desc("fechaGeneracion")
            .limit(limit.unwrap_or(self.default_limit));
        if let Some(uid) = &filters.uid {
            query = query.where_eq("uid", uid.as_str());
        } else if let Some(rol) = filters.rol {
            query = query.where_eq("rol", rol.as_str());
        }

        let fetched = self
            .repo()
            .query(&query)
            .await
            .inspect_err(|e| error!(error = %e, "Failed to load reports"))?;

        let now = self.clock.now();
        let busqueda = filters
            .busqueda
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .map(str::to_lowercase);

        let reports: Vec<Report> = fetched
            .into_iter()
            .map(|mut report| {
                report.fecha_generacion.get_or_insert(now);
                report.created_at.get_or_insert(now);
                report
            })
            .filter(|report| {
                let fecha = report.fecha_generacion.unwrap_or(now);
                filters.fecha_inicio.is_none_or(|inicio| fecha >= inicio)
                    && filters.fecha_fin.is_none_or(|fin| fecha <= fin)
            })
            .filter(|report| {
                filters
                    .plataforma
                    .is_none_or(|p| report.plataforma == Some(p))
            })
            .filter(|report| {
                filters
                    .tipo_item
                    .is_none_or(|kind| report.tipo_item == Some(kind))
            })
            .filter(|report| busqueda.as_deref().is_none_or(|text| mentions(report, text)))
            .collect();

        info!(count = reports.len(), "Reports loaded");
        if let Ok(mut loaded) = self.loaded.write() {
            loaded.clone_from(&reports);
        }
        Ok(reports)
    }

    /// The last loaded page.
    #[must_use]
    pub fn reports(&self) -> Vec<Report> {
        self.loaded.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Counters over the last loaded page.
    ///
    /// Reports without a message platform are counted in `total` only.
    #[must_use]
    pub fn stats(&self) -> ReportStats {
        let reports = self.reports();
        let mut stats = ReportStats {
            total: reports.len(),
            ..ReportStats::default()
        };
        for report in &reports {
            *stats
                .por_usuario
                .entry(report.uid.as_str().to_owned())
                .or_default() += 1;
            if let Some(platform) = report.plataforma_mensaje {
                *stats
                    .por_plataforma
                    .entry(platform.as_str().to_owned())
                    .or_default() += 1;
            }
            *stats
                .por_rol
                .entry(report.rol.as_str().to_owned())
                .or_default() += 1;
        }
        stats
    }

    /// Forget the loaded page.
    pub fn reset(&self) {
        if let Ok(mut loaded) = self.loaded.write() {
            loaded.clear();
        }
    }
}

fn put_customer(fields: &mut Fields, cliente: CustomerInfo) {
    if let Some(nombre) = cliente.cliente_nombre {
        fields.insert("clienteNombre".into(), Value::from(nombre));
    }
    if let Some(telefono) = cliente.cliente_telefono {
        fields.insert("clienteTelefono".into(), Value::from(telefono));
    }
    if let Some(tipo) = cliente.tipo_cuenta {
        fields.insert("tipoCuenta".into(), Value::from(tipo.as_str()));
    }
}

/// Whether `needle` (already lower-cased) appears in the report's game name,
/// account email, employee email or employee name.
fn mentions(report: &Report, needle: &str) -> bool {
    [
        &report.juego_nombre,
        &report.correo_utilizado,
        &report.email,
        &report.nombre_usuario,
    ]
    .iter()
    .any(|haystack| haystack.to_lowercase().contains(needle))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use zona_gamer_core::{AccountTier, ItemId, ItemKind, MessagePlatform, Platform, UserRole, UserUid};

    use super::*;
    use crate::clock::ManualClock;
    use crate::db::InMemoryStore;
    use crate::models::CodesUsed;

    fn fixture() -> (Arc<ManualClock>, Arc<InMemoryStore>, ReportService) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2025, 4, 1, 10, 0, 0).unwrap(),
        ));
        let store = Arc::new(InMemoryStore::with_clock(clock.clone()));
        let service = ReportService::new(store.clone(), clock.clone(), 100);
        (clock, store, service)
    }

    fn report(uid: &str, rol: UserRole, juego: &str, mensaje: MessagePlatform) -> NewReport {
        NewReport {
            uid: UserUid::new(uid),
            email: Some(format!("{uid}@zonagamer.com")),
            display_name: None,
            rol,
            tipo_item: ItemKind::Game,
            juego_nombre: juego.to_string(),
            juego_id: ItemId::from_name(juego, ItemKind::Game).into_inner(),
            plataforma: Platform::Ps4,
            correo_utilizado: "cuenta1@gmail.com".into(),
            codigos_usados: CodesUsed {
                codigo1: "111".into(),
                codigo2: "222".into(),
            },
            plataforma_mensaje: mensaje,
            cliente: CustomerInfo::default(),
        }
    }

    #[tokio::test]
    async fn test_record_falls_back_to_email_for_name() {
        let (_, _, service) = fixture();
        service
            .record(report("ana", UserRole::Employee, "Fifa 25", MessagePlatform::Ps4))
            .await
            .unwrap();

        let reports = service.list(&ReportFilters::default(), None).await.unwrap();
        let stored = reports.first().unwrap();
        assert_eq!(stored.nombre_usuario, "ana@zonagamer.com");
        assert_eq!(stored.tipo_item, Some(ItemKind::Game));
        assert!(stored.cliente_nombre.is_none());
        assert!(stored.fecha_generacion.is_some());
    }

    #[tokio::test]
    async fn test_record_without_email_uses_placeholder() {
        let (_, _, service) = fixture();
        let mut new = report("ana", UserRole::Admin, "Fifa 25", MessagePlatform::Ps4);
        new.email = None;
        service.record(new).await.unwrap();

        let reports = service.list(&ReportFilters::default(), None).await.unwrap();
        assert_eq!(reports.first().unwrap().nombre_usuario, "Usuario");
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let (clock, _, service) = fixture();
        service
            .record(report("ana", UserRole::Employee, "Fifa 25", MessagePlatform::Ps4))
            .await
            .unwrap();
        clock.advance(Duration::hours(1));
        service
            .record(report("ana", UserRole::Employee, "GTA V", MessagePlatform::Ps5))
            .await
            .unwrap();
        clock.advance(Duration::hours(1));
        service
            .record(report("luis", UserRole::Admin, "Fifa 25", MessagePlatform::Ps5))
            .await
            .unwrap();

        let by_uid = ReportFilters {
            uid: Some(UserUid::new("ana")),
            ..ReportFilters::default()
        };
        let reports = service.list(&by_uid, None).await.unwrap();
        let names: Vec<&str> = reports.iter().map(|r| r.juego_nombre.as_str()).collect();
        assert_eq!(names, ["GTA V", "Fifa 25"]);

        let search = ReportFilters {
            busqueda: Some("FIFA".into()),
            ..ReportFilters::default()
        };
        assert_eq!(service.list(&search, None).await.unwrap().len(), 2);

        let limited = service.list(&ReportFilters::default(), Some(1)).await.unwrap();
        assert_eq!(limited.first().unwrap().uid.as_str(), "luis");
    }

    #[tokio::test]
    async fn test_stats_count_loaded_page() {
        let (_, _, service) = fixture();
        service
            .record(report("ana", UserRole::Employee, "Fifa 25", MessagePlatform::Ps4))
            .await
            .unwrap();
        service
            .record(report("ana", UserRole::Employee, "GTA V", MessagePlatform::Ps5))
            .await
            .unwrap();
        service
            .record(report("luis", UserRole::Admin, "Fifa 25", MessagePlatform::Ps5))
            .await
            .unwrap();

        service.list(&ReportFilters::default(), None).await.unwrap();
        let stats = service.stats();

        assert_eq!(stats.total, 3);
        assert_eq!(stats.por_usuario["ana"], 2);
        assert_eq!(stats.por_plataforma["PS5"], 2);
        assert_eq!(stats.por_rol["admin"], 1);

        service.reset();
        assert_eq!(service.stats().total, 0);
    }

    #[tokio::test]
    async fn test_amend_adds_customer() {
        let (_, _, service) = fixture();
        let id = service
            .record(report("ana", UserRole::Employee, "Fifa 25", MessagePlatform::Ps4))
            .await
            .unwrap();

        service
            .amend(
                &id,
                CustomerInfo {
                    cliente_nombre: Some("Carlos".into()),
                    cliente_telefono: Some("0991234567".into()),
                    tipo_cuenta: Some(AccountTier::PrincipalPs4),
                },
            )
            .await
            .unwrap();

        let reports = service.list(&ReportFilters::default(), None).await.unwrap();
        let stored = reports.first().unwrap();
        assert_eq!(stored.cliente_nombre.as_deref(), Some("Carlos"));
        assert_eq!(stored.tipo_cuenta, Some(AccountTier::PrincipalPs4));
        assert!(stored.updated_at.is_some());
    }

    #[tokio::test]
    async fn test_amend_missing_report_fails() {
        let (_, _, service) = fixture();
        let err = service
            .amend(&ReportId::new("nope"), CustomerInfo::default())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::Database(crate::db::RepositoryError::NotFound(_))
        ));
    }
}
