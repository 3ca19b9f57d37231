use anyhow::Result;
use dotenvy::dotenv;
use log::{debug, error, info, warn};
use serenity::async_trait;
use serenity::model::application::interaction::{Interaction, InteractionResponseType};
use serenity::model::channel::Message;
use serenity::model::gateway::Ready;
use serenity::model::id::GuildId;
use serenity::prelude::*;
use std::sync::Arc;
use tokio::sync::watch;

use agenda::commands::{register_global_commands, register_guild_commands, CommandHandler};
use agenda::core::Config;
use agenda::database::Database;
use agenda::features::reminders::{CleanupSweeper, DiscordNotifier, ReminderScheduler};
use agenda::store::AppointmentStore;

struct Handler {
    command_handler: Arc<CommandHandler>,
    guild_id: Option<GuildId>,
}

#[async_trait]
impl EventHandler for Handler {
    async fn message(&self, ctx: Context, msg: Message) {
        if msg.author.bot {
            return;
        }

        if let Err(e) = self.command_handler.handle_message(&ctx, &msg).await {
            error!("Error handling message: {e}");
            if let Err(why) = msg
                .channel_id
                .say(&ctx.http, "❌ Ocorreu um erro ao processar sua mensagem.")
                .await
            {
                error!("Failed to send error message: {why}");
            }
        }
    }

    async fn ready(&self, ctx: Context, ready: Ready) {
        info!("🎉 {} is connected and ready!", ready.user.name);
        info!("📡 Connected to {} guilds", ready.guilds.len());

        // Guild commands update instantly; global ones can take up to an hour
        if let Some(guild_id) = self.guild_id {
            info!("🔧 Development mode: Registering commands for guild {guild_id}");
            if let Err(e) = register_guild_commands(&ctx, guild_id).await {
                error!("❌ Failed to register guild slash commands: {e}");
            }
        } else {
            info!("🌍 Production mode: Registering commands globally");
            if let Err(e) = register_global_commands(&ctx).await {
                error!("❌ Failed to register global slash commands: {e}");
            }
        }
    }

    async fn interaction_create(&self, ctx: Context, interaction: Interaction) {
        if let Interaction::ApplicationCommand(command) = interaction {
            if let Err(e) = self
                .command_handler
                .handle_slash_command(&ctx, &command)
                .await
            {
                error!(
                    "Error handling slash command '{}': {}",
                    command.data.name, e
                );

                let error_message = "❌ Não foi possível processar seu comando. Tente novamente.";
                if let Err(why) = command
                    .create_interaction_response(&ctx.http, |response| {
                        response
                            .kind(InteractionResponseType::ChannelMessageWithSource)
                            .interaction_response_data(|message| message.content(error_message))
                    })
                    .await
                {
                    warn!("Failed to report command error: {why}");
                }
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let config = Config::from_env()?;

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.log_level))
        .init();

    info!("Starting appointment reminder bot...");

    let database = Database::new(&config.database_path).await?;
    let store: Arc<dyn AppointmentStore> = Arc::new(database);

    let command_handler = CommandHandler::new(store.clone());

    // Parse guild ID if provided for development mode
    let guild_id = config
        .discord_guild_id
        .as_ref()
        .and_then(|id| id.parse::<u64>().ok())
        .map(GuildId);

    let handler = Handler {
        command_handler: Arc::new(command_handler),
        guild_id,
    };

    let intents = GatewayIntents::GUILDS
        | GatewayIntents::GUILD_MESSAGES
        | GatewayIntents::DIRECT_MESSAGES
        | GatewayIntents::MESSAGE_CONTENT;

    let mut client = Client::builder(&config.discord_token, intents)
        .event_handler(handler)
        .await
        .map_err(|e| {
            error!("Failed to create Discord client: {e}");
            anyhow::anyhow!("Client creation failed: {}", e)
        })?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Start the reminder scheduler
    let notifier = Arc::new(DiscordNotifier::new(client.cache_and_http.http.clone()));
    let scheduler = ReminderScheduler::new(
        store.clone(),
        notifier,
        config.reminder_interval,
        config.reminder_initial_delay,
    );
    let scheduler_shutdown = shutdown_rx.clone();
    let scheduler_task = tokio::spawn(async move {
        scheduler.run(scheduler_shutdown).await;
    });

    // Start the cleanup sweeper
    let sweeper = CleanupSweeper::new(
        store,
        config.cleanup_interval,
        config.cleanup_initial_delay,
    );
    let sweeper_task = tokio::spawn(async move {
        sweeper.run(shutdown_rx).await;
    });

    // Ctrl-C stops the background loops and the gateway shards
    let shard_manager = client.shard_manager.clone();
    let signal_shutdown = shutdown_tx.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {e}");
            return;
        }
        info!("Shutdown signal received");
        if signal_shutdown.send(true).is_err() {
            debug!("No background loop was listening for shutdown");
        }
        shard_manager.lock().await.shutdown_all().await;
    });

    info!("Establishing WebSocket connection to Discord gateway...");
    let gateway_result = client.start().await;

    if shutdown_tx.send(true).is_err() {
        debug!("Background loops had already stopped");
    }
    for (name, task) in [("scheduler", scheduler_task), ("sweeper", sweeper_task)] {
        if let Err(e) = task.await {
            error!("Reminder {name} task ended abnormally: {e}");
        }
    }

    if let Err(why) = gateway_result {
        error!("Gateway connection failed: {why:?}");
        return Err(anyhow::anyhow!(
            "Failed to establish gateway connection: {}",
            why
        ));
    }

    info!("Bot stopped");
    Ok(())
}
