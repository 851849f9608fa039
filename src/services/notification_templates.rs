//! HTML bodies for customer emails. All templates share one shell.

use crate::utils::format::{format_brl, format_date_br};
use chrono::{DateTime, Utc};

/// The client, contract, plan and pets an email refers to.
#[derive(Debug, Clone, Default)]
pub struct MailContext {
    pub client_name: String,
    pub contract_number: String,
    pub plan_name: String,
    pub pet_names: Vec<String>,
}

impl MailContext {
    fn coverage(&self) -> String {
        let mut line = format!("Plano: <strong>{}</strong>", escape(&self.plan_name));
        if !self.pet_names.is_empty() {
            let pets: Vec<String> = self.pet_names.iter().map(|p| escape(p)).collect();
            line.push_str(&format!("<br>Pet(s): <strong>{}</strong>", pets.join(", ")));
        }
        format!("<p>{line}</p>")
    }
}

pub struct RenderedEmail {
    pub subject: String,
    pub html: String,
}

struct CallToAction<'a> {
    label: &'a str,
    url: String,
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn shell(title: &str, accent: &str, content: &str, cta: Option<CallToAction<'_>>) -> String {
    let button = cta
        .map(|c| {
            format!(
                r#"<p style="text-align:center;margin:32px 0;"><a href="{url}" style="background:{accent};color:#ffffff;padding:12px 28px;border-radius:6px;text-decoration:none;font-weight:bold;">{label}</a></p>"#,
                url = escape(&c.url),
                label = escape(c.label),
            )
        })
        .unwrap_or_default();

    format!(
        r#"<!DOCTYPE html>
<html lang="pt-BR">
<head><meta charset="utf-8"><title>{title}</title></head>
<body style="margin:0;padding:0;background:#f4f6f8;font-family:Arial,Helvetica,sans-serif;color:#333333;">
  <table width="100%" cellpadding="0" cellspacing="0"><tr><td align="center">
    <table width="600" cellpadding="0" cellspacing="0" style="background:#ffffff;margin:24px 0;border-radius:8px;overflow:hidden;">
      <tr><td style="background:{accent};padding:24px;text-align:center;color:#ffffff;">
        <h1 style="margin:0;font-size:24px;">UNIPET PLAN</h1>
        <p style="margin:8px 0 0;font-size:16px;">{title}</p>
      </td></tr>
      <tr><td style="padding:32px;font-size:15px;line-height:1.6;">
        {content}
        {button}
      </td></tr>
      <tr><td style="background:#f0f0f0;padding:16px;text-align:center;font-size:12px;color:#777777;">
        Este é um e-mail automático da UNIPET PLAN. Em caso de dúvidas, responda esta mensagem ou acesse sua área do cliente.
      </td></tr>
    </table>
  </td></tr></table>
</body>
</html>"#,
        title = escape(title),
    )
}

fn portal_url(public_url: &str) -> String {
    format!("{}/cliente/financeiro", public_url.trim_end_matches('/'))
}

pub fn payment_reminder(
    public_url: &str,
    ctx: &MailContext,
    amount_cents: i64,
    due_date: DateTime<Utc>,
    days_until_due: i64,
) -> RenderedEmail {
    let content = format!(
        "<p>Olá, <strong>{name}</strong>!</p>\
         <p>A próxima mensalidade do seu contrato <strong>{contract}</strong> vence em {days} dia(s).</p>\
         {coverage}\
         <p>Valor: <strong>{amount}</strong><br>Vencimento: <strong>{due}</strong></p>\
         <p>Se o pagamento for automático no cartão, não é necessário fazer nada.</p>",
        name = escape(&ctx.client_name),
        contract = escape(&ctx.contract_number),
        coverage = ctx.coverage(),
        days = days_until_due,
        amount = format_brl(amount_cents),
        due = format_date_br(due_date),
    );
    RenderedEmail {
        subject: format!("Lembrete: seu pagamento vence em {days_until_due} dia(s)"),
        html: shell(
            "Lembrete de pagamento",
            "#2b7de9",
            &content,
            Some(CallToAction {
                label: "Ver meus pagamentos",
                url: portal_url(public_url),
            }),
        ),
    }
}

pub fn payment_overdue(
    public_url: &str,
    ctx: &MailContext,
    amount_cents: i64,
    due_date: DateTime<Utc>,
    days_overdue: i64,
) -> RenderedEmail {
    let content = format!(
        "<p>Olá, <strong>{name}</strong>!</p>\
         <p>Identificamos que o pagamento do contrato <strong>{contract}</strong> está em atraso há {days} dia(s).</p>\
         {coverage}\
         <p>Valor: <strong>{amount}</strong><br>Vencimento: <strong>{due}</strong></p>\
         <p>Regularize o pagamento para manter a cobertura do seu pet ativa.</p>",
        name = escape(&ctx.client_name),
        contract = escape(&ctx.contract_number),
        coverage = ctx.coverage(),
        days = days_overdue,
        amount = format_brl(amount_cents),
        due = format_date_br(due_date),
    );
    RenderedEmail {
        subject: format!("Pagamento em atraso há {days_overdue} dia(s)"),
        html: shell(
            "Pagamento em atraso",
            "#e0533d",
            &content,
            Some(CallToAction {
                label: "Regularizar pagamento",
                url: portal_url(public_url),
            }),
        ),
    }
}

pub fn renewal_success(
    public_url: &str,
    ctx: &MailContext,
    amount_cents: i64,
    next_due_date: DateTime<Utc>,
) -> RenderedEmail {
    let content = format!(
        "<p>Olá, <strong>{name}</strong>!</p>\
         <p>A renovação do contrato <strong>{contract}</strong> foi processada com sucesso.</p>\
         {coverage}\
         <p>Valor cobrado: <strong>{amount}</strong><br>Próximo vencimento: <strong>{next}</strong></p>\
         <p>Obrigado por cuidar do seu pet com a UNIPET PLAN.</p>",
        name = escape(&ctx.client_name),
        contract = escape(&ctx.contract_number),
        coverage = ctx.coverage(),
        amount = format_brl(amount_cents),
        next = format_date_br(next_due_date),
    );
    RenderedEmail {
        subject: "Renovação do seu plano confirmada".to_string(),
        html: shell(
            "Renovação confirmada",
            "#2f9e5a",
            &content,
            Some(CallToAction {
                label: "Acessar minha conta",
                url: format!("{}/cliente", public_url.trim_end_matches('/')),
            }),
        ),
    }
}

pub fn renewal_failure(
    public_url: &str,
    ctx: &MailContext,
    amount_cents: i64,
    reason: &str,
) -> RenderedEmail {
    let content = format!(
        "<p>Olá, <strong>{name}</strong>!</p>\
         <p>Não conseguimos processar a renovação do contrato <strong>{contract}</strong> no valor de <strong>{amount}</strong>.</p>\
         {coverage}\
         <p>Motivo: {reason}</p>\
         <p>Atualize seu cartão ou realize o pagamento manualmente para evitar a suspensão da cobertura.</p>",
        name = escape(&ctx.client_name),
        contract = escape(&ctx.contract_number),
        coverage = ctx.coverage(),
        amount = format_brl(amount_cents),
        reason = escape(reason),
    );
    RenderedEmail {
        subject: "Não foi possível renovar seu plano".to_string(),
        html: shell(
            "Falha na renovação",
            "#e0533d",
            &content,
            Some(CallToAction {
                label: "Atualizar forma de pagamento",
                url: portal_url(public_url),
            }),
        ),
    }
}
