//! Entry point for gateway events: slash command dispatch and dialog turns.

use anyhow::Result;
use chrono::{Local, NaiveDateTime};
use log::{debug, info, warn};
use serenity::model::application::interaction::application_command::ApplicationCommandInteraction;
use serenity::model::channel::Message;
use serenity::prelude::Context;
use std::sync::Arc;

use crate::commands::context::{session_key, CommandContext};
use crate::commands::handler::respond;
use crate::commands::handlers::create_registry;
use crate::commands::registry::CommandRegistry;
use crate::core::{chunk_for_message, format_when};
use crate::features::scheduling::{DialogStep, SessionKey, TurnOutcome};
use crate::store::AppointmentStore;

#[derive(Clone)]
pub struct CommandHandler {
    context: Arc<CommandContext>,
    registry: CommandRegistry,
}

impl CommandHandler {
    pub fn new(store: Arc<dyn AppointmentStore>) -> Self {
        CommandHandler {
            context: Arc::new(CommandContext::new(store)),
            registry: create_registry(),
        }
    }

    pub fn context(&self) -> Arc<CommandContext> {
        self.context.clone()
    }

    pub async fn handle_slash_command(
        &self,
        ctx: &Context,
        command: &ApplicationCommandInteraction,
    ) -> Result<()> {
        info!(
            "📥 Slash command received | Command: {} | User: {} | Channel: {}",
            command.data.name, command.user.id, command.channel_id
        );

        match self.registry.get(&command.data.name) {
            Some(handler) => handler.handle(self.context.clone(), ctx, command).await,
            None => {
                warn!("No handler registered for /{}", command.data.name);
                respond(ctx, command, "❓ Comando desconhecido. Use /start para ver os comandos.")
                    .await
            }
        }
    }

    /// Treat a plain message as a turn of its author's dialog in that channel
    pub async fn handle_message(&self, ctx: &Context, msg: &Message) -> Result<()> {
        let key = session_key(msg.channel_id, msg.author.id);
        let now = Local::now().naive_local();

        if let Some(reply) = self.dialog_reply(key, &msg.content, now).await {
            for chunk in chunk_for_message(&reply) {
                msg.channel_id.say(&ctx.http, chunk).await?;
            }
        }
        Ok(())
    }

    /// Reply text for a dialog turn, or `None` when the message is not part of a dialog
    pub async fn dialog_reply(
        &self,
        key: SessionKey,
        content: &str,
        now: NaiveDateTime,
    ) -> Option<String> {
        let outcome = self.context.sessions.handle_turn(key, content, now).await;
        debug!("Dialog turn for {key}: {outcome:?}");

        let reply = match outcome {
            TurnOutcome::NoSession => return None,
            TurnOutcome::Advanced(step) => step.prompt().to_string(),
            TurnOutcome::Rejected { error, .. } => error.reprompt().to_string(),
            TurnOutcome::Completed { id, appointment } => format!(
                "✅ **Compromisso agendado!** (ID {id})\n\n📌 {}\n🕐 {}\n\n\
                 Você receberá lembretes com 5 dias, 1 dia e 1 hora de antecedência.",
                appointment.description,
                format_when(appointment.scheduled_at)
            ),
            TurnOutcome::StoreFailed(_) => {
                "❌ Não foi possível salvar o compromisso agora. Envie o horário novamente para tentar outra vez."
                    .to_string()
            }
            TurnOutcome::Cancelled => DialogStep::Cancelled.prompt().to_string(),
            TurnOutcome::Discarded => {
                "ℹ️ Agendamento interrompido. Use /agendar para começar de novo.".to_string()
            }
        };
        Some(reply)
    }
}
