//! Appointment slash commands: /start, /agendar, /listar, /deletar, /cancelar

use serenity::builder::CreateApplicationCommand;
use serenity::model::application::command::CommandOptionType;

pub fn create_commands() -> Vec<CreateApplicationCommand> {
    vec![
        simple_command("start", "Mostra os comandos disponíveis"),
        simple_command("agendar", "Criar um novo compromisso"),
        simple_command("listar", "Ver seus próximos compromissos"),
        create_deletar_command(),
        simple_command("cancelar", "Cancelar o agendamento em andamento"),
    ]
}

fn simple_command(name: &str, description: &str) -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name(name)
        .description(description)
        .to_owned()
}

fn create_deletar_command() -> CreateApplicationCommand {
    CreateApplicationCommand::default()
        .name("deletar")
        .description("Remover um compromisso")
        .create_option(|option| {
            option
                .name("id")
                .description("ID do compromisso (veja com /listar)")
                .kind(CommandOptionType::Integer)
                .required(true)
        })
        .to_owned()
}
