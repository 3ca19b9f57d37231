//! Tier-specific reminder text

use super::ReminderTier;
use crate::core::format_when;
use crate::store::Appointment;

pub fn render_reminder(tier: ReminderTier, appointment: &Appointment) -> String {
    let headline = match tier {
        ReminderTier::FiveDays => "📅 **Lembrete: 5 dias**\n\nVocê tem um compromisso em breve:",
        ReminderTier::OneDay => "⏰ **Lembrete: 1 dia**\n\nSeu compromisso é **amanhã**:",
        ReminderTier::OneHour => "🔔 **Lembrete: 1 hora**\n\nSeu compromisso começa em **1 hora**:",
    };
    format!(
        "{headline}\n📌 {}\n🕐 {}",
        appointment.description,
        format_when(appointment.scheduled_at)
    )
}
