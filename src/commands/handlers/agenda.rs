//! Appointment command handlers
//!
//! Handles: start, agendar, cancelar (dialog control) and listar, deletar
//! (stored appointments).
//!
//! - **Version**: 1.0.0
//! - **Since**: 1.0.0

use anyhow::Result;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use log::{debug, error, info};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::{session_key, CommandContext};
use crate::commands::handler::{respond, SlashCommandHandler};
use crate::commands::slash::get_integer_option;
use crate::core::format_when;
use crate::features::scheduling::{DialogStep, SessionKey};
use crate::store::Appointment;

pub const HELP_TEXT: &str = "👋 Olá! Eu sou seu bot de compromissos.\n\n\
Comandos disponíveis:\n\
/agendar: criar novo compromisso\n\
/listar: ver seus compromissos\n\
/deletar: remover um compromisso\n\
/cancelar: cancelar a ação atual\n\n\
Você recebe lembretes 5 dias, 1 dia e 1 hora antes de cada compromisso.";

const STORE_FAILURE: &str = "❌ Não consegui acessar seus compromissos agora. Tente novamente em instantes.";

/// Handler for the dialog entry and exit commands
pub struct DialogHandler;

#[async_trait]
impl SlashCommandHandler for DialogHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["start", "agendar", "cancelar"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let key = session_key(command.channel_id, command.user.id);
        let reply = match command.data.name.as_str() {
            "start" => Self::start(&ctx, key),
            "agendar" => Self::begin(&ctx, key),
            "cancelar" => Self::cancel(&ctx, key),
            _ => return Ok(()),
        };
        respond(serenity_ctx, command, &reply).await
    }
}

impl DialogHandler {
    fn start(ctx: &CommandContext, key: SessionKey) -> String {
        ctx.sessions.discard(key);
        HELP_TEXT.to_string()
    }

    fn begin(ctx: &CommandContext, key: SessionKey) -> String {
        if ctx.sessions.start(key) {
            debug!("Dialog {key} restarted");
        }
        DialogStep::AwaitDescription.prompt().to_string()
    }

    fn cancel(ctx: &CommandContext, key: SessionKey) -> String {
        ctx.sessions.cancel(key);
        DialogStep::Cancelled.prompt().to_string()
    }
}

/// Handler for commands on stored appointments
pub struct AppointmentsHandler;

#[async_trait]
impl SlashCommandHandler for AppointmentsHandler {
    fn command_names(&self) -> &'static [&'static str] {
        &["listar", "deletar"]
    }

    async fn handle(
        &self,
        ctx: Arc<CommandContext>,
        serenity_ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        let key = session_key(command.channel_id, command.user.id);
        let now = Local::now().naive_local();
        let reply = match command.data.name.as_str() {
            "listar" => Self::list(&ctx, key, now).await,
            "deletar" => {
                let id = get_integer_option(&command.data.options, "id");
                Self::delete(&ctx, key, id).await
            }
            _ => return Ok(()),
        };
        respond(serenity_ctx, command, &reply).await
    }
}

impl AppointmentsHandler {
    async fn list(ctx: &CommandContext, key: SessionKey, now: NaiveDateTime) -> String {
        ctx.sessions.discard(key);
        let owner_id = key.owner_id;
        match ctx.store.list_upcoming(owner_id, now).await {
            Ok(appointments) => format_listing(&appointments),
            Err(e) => {
                error!("Failed to list appointments for owner {owner_id}: {e}");
                STORE_FAILURE.to_string()
            }
        }
    }

    async fn delete(ctx: &CommandContext, key: SessionKey, id: Option<i64>) -> String {
        ctx.sessions.discard(key);
        let owner_id = key.owner_id;
        let Some(id) = id else {
            return "ℹ️ Use: /deletar <ID>\nExemplo: /deletar 3\n\nConsulte os IDs com /listar"
                .to_string();
        };

        match ctx.store.delete(id, owner_id).await {
            Ok(true) => {
                info!("Owner {owner_id} deleted appointment {id}");
                format!("🗑️ Compromisso #{id} removido.")
            }
            Ok(false) => "❌ Compromisso não encontrado.".to_string(),
            Err(e) => {
                error!("Failed to delete appointment {id} for owner {owner_id}: {e}");
                STORE_FAILURE.to_string()
            }
        }
    }
}

/// Render an owner's upcoming appointments, one paragraph each
pub fn format_listing(appointments: &[Appointment]) -> String {
    if appointments.is_empty() {
        return "📭 Você não tem compromissos agendados.".to_string();
    }

    let mut text = String::from("📋 **Seus compromissos:**");
    for appointment in appointments {
        text.push_str(&format!(
            "\n\n🔹 **ID {}**\n📌 {}\n🕐 {}",
            appointment.id,
            appointment.description,
            format_when(appointment.scheduled_at)
        ));
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::memory::MemoryStore;
    use crate::store::{AppointmentStore, NewAppointment, OwnerId};
    use chrono::{Duration, NaiveDate};
    use std::sync::atomic::Ordering;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 20)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn key(owner_id: OwnerId) -> SessionKey {
        SessionKey::new(owner_id, 77)
    }

    fn context() -> (Arc<MemoryStore>, CommandContext) {
        let store = Arc::new(MemoryStore::new());
        let ctx = CommandContext::new(store.clone());
        (store, ctx)
    }

    async fn create(store: &MemoryStore, owner_id: OwnerId, description: &str, hours: i64) -> i64 {
        store
            .create(&NewAppointment {
                owner_id,
                description: description.to_string(),
                scheduled_at: now() + Duration::hours(hours),
            })
            .await
            .unwrap()
    }

    #[test]
    fn test_handler_command_names() {
        assert_eq!(DialogHandler.command_names(), &["start", "agendar", "cancelar"]);
        assert_eq!(AppointmentsHandler.command_names(), &["listar", "deletar"]);
    }

    #[test]
    fn test_agendar_opens_and_cancelar_closes_dialog() {
        let (_store, ctx) = context();

        let reply = DialogHandler::begin(&ctx, key(1));
        assert_eq!(reply, DialogStep::AwaitDescription.prompt());
        assert_eq!(ctx.sessions.step(key(1)), Some(DialogStep::AwaitDescription));

        DialogHandler::cancel(&ctx, key(1));
        assert_eq!(ctx.sessions.step(key(1)), None);

        // Cancelling with nothing open still confirms
        assert_eq!(DialogHandler::cancel(&ctx, key(1)), DialogStep::Cancelled.prompt());
    }

    #[test]
    fn test_cancelar_only_closes_callers_dialog() {
        let (_store, ctx) = context();
        let other = SessionKey::new(1, 88);
        DialogHandler::begin(&ctx, key(1));

        DialogHandler::cancel(&ctx, other);
        assert_eq!(ctx.sessions.step(key(1)), Some(DialogStep::AwaitDescription));
    }

    #[test]
    fn test_start_discards_dialog() {
        let (_store, ctx) = context();
        ctx.sessions.start(key(1));
        assert!(DialogHandler::start(&ctx, key(1)).contains("/agendar"));
        assert_eq!(ctx.sessions.step(key(1)), None);
    }

    #[tokio::test]
    async fn test_list_shows_only_owner_upcoming() {
        let (store, ctx) = context();
        create(&store, 1, "Dentist", 48).await;
        create(&store, 1, "Gym", 2).await;
        create(&store, 1, "Yesterday", -24).await;
        create(&store, 2, "Someone else", 5).await;
        ctx.sessions.start(key(1));

        let reply = AppointmentsHandler::list(&ctx, key(1), now()).await;
        assert!(reply.find("Gym").unwrap() < reply.find("Dentist").unwrap());
        assert!(!reply.contains("Yesterday"));
        assert!(!reply.contains("Someone else"));
        assert_eq!(ctx.sessions.step(key(1)), None);
    }

    #[tokio::test]
    async fn test_list_empty_and_failure() {
        let (store, ctx) = context();
        assert!(AppointmentsHandler::list(&ctx, key(1), now()).await.contains("não tem"));

        store.fail_all.store(true, Ordering::SeqCst);
        assert_eq!(AppointmentsHandler::list(&ctx, key(1), now()).await, STORE_FAILURE);
    }

    #[tokio::test]
    async fn test_delete_is_owner_scoped() {
        let (store, ctx) = context();
        let id = create(&store, 2, "Owned by two", 5).await;

        let reply = AppointmentsHandler::delete(&ctx, key(1), Some(id)).await;
        assert!(reply.contains("não encontrado"));
        assert!(store.snapshot(id).is_some());

        let reply = AppointmentsHandler::delete(&ctx, key(2), Some(id)).await;
        assert!(reply.contains(&format!("#{id}")));
        assert!(store.snapshot(id).is_none());
    }

    #[tokio::test]
    async fn test_delete_without_id_shows_usage() {
        let (_store, ctx) = context();
        assert!(AppointmentsHandler::delete(&ctx, key(1), None).await.contains("/deletar <ID>"));
    }

    #[test]
    fn test_format_listing() {
        let appointment = Appointment {
            id: 3,
            owner_id: 1,
            description: "Dentist".to_string(),
            scheduled_at: NaiveDate::from_ymd_opt(2025, 3, 25)
                .unwrap()
                .and_hms_opt(14, 30, 0)
                .unwrap(),
            tier_5d_fired: false,
            tier_1d_fired: false,
            tier_1h_fired: false,
            created_at: now(),
        };
        let text = format_listing(&[appointment]);
        assert!(text.contains("ID 3"));
        assert!(text.contains("Dentist"));
        assert!(text.contains("25/03/2025 às 14:30"));
    }
}
