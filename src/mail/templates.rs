use lazy_static::lazy_static;
use regex::Regex;

use super::{EmailKind, EmailMessage, MailError, TemplateParams};

lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{([A-Za-z][A-Za-z0-9_]*)\}").unwrap();
}

/// Substitute every `{name}` in `template` from `params`.
///
/// Unused parameters are ignored; a placeholder with no value is an error.
pub fn render(template: &str, params: &TemplateParams) -> Result<String, MailError> {
    substitute(template, params, |v| v.to_string())
}

/// Like [`render`], but values are HTML-escaped before substitution.
pub fn render_html(template: &str, params: &TemplateParams) -> Result<String, MailError> {
    substitute(template, params, escape_html)
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn substitute(
    template: &str,
    params: &TemplateParams,
    encode: impl Fn(&str) -> String,
) -> Result<String, MailError> {
    let mut out = String::with_capacity(template.len());
    let mut last = 0;
    for caps in PLACEHOLDER_RE.captures_iter(template) {
        let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        let value = params.get(name.as_str()).ok_or_else(|| {
            MailError::TemplateFailed(format!("missing parameter `{}`", name.as_str()))
        })?;
        out.push_str(&template[last..whole.start()]);
        out.push_str(&encode(value));
        last = whole.end();
    }
    out.push_str(&template[last..]);
    Ok(out)
}

struct Template {
    subject: &'static str,
    html: &'static str,
    text: &'static str,
}

fn template_for(kind: EmailKind) -> Template {
    match kind {
        EmailKind::Verification => Template {
            subject: "Verify your email",
            html: VERIFICATION_HTML,
            text: "Thank you for signing up! Your verification code is: {verificationCode}\n\
                   This code will expire in 20 hours.",
        },
        EmailKind::Welcome => Template {
            subject: "Welcome to Our Service!",
            html: "<p>Hello {name}, welcome to our service!</p>",
            text: "Hello {name}, welcome to our service!",
        },
        EmailKind::ForgotPassword => Template {
            subject: "Password Reset Request",
            html: PASSWORD_RESET_REQUEST_HTML,
            text: "We received a request to reset your password. \
                   Follow this link to choose a new one: {resetURL}\n\
                   The link will expire in 1 hour.",
        },
        EmailKind::ResetSuccess => Template {
            subject: "Password Reset Successful",
            html: PASSWORD_RESET_SUCCESS_HTML,
            text: "Your password has been successfully reset.",
        },
    }
}

/// Build the full message for an email of `kind`.
pub fn compose(kind: EmailKind, to: &str, params: &TemplateParams) -> Result<EmailMessage, MailError> {
    let t = template_for(kind);
    Ok(EmailMessage {
        to: to.to_string(),
        subject: t.subject.to_string(),
        html_body: render_html(t.html, params)?,
        text_body: render(t.text, params)?,
    })
}

const VERIFICATION_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Verify Your Email</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #4CAF50;">Verify Your Email</h1>
  <p>Thank you for signing up! Your verification code is:</p>
  <p style="font-size: 32px; font-weight: bold; letter-spacing: 5px; color: #4CAF50; text-align: center;">{verificationCode}</p>
  <p>Enter this code on the verification page to complete your registration.</p>
  <p>This code will expire in 20 hours for security reasons.</p>
</body>
</html>"#;

const PASSWORD_RESET_REQUEST_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Reset Your Password</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #4CAF50;">Password Reset</h1>
  <p>We received a request to reset your password. If you didn't make this request, please ignore this email.</p>
  <p style="text-align: center;"><a href="{resetURL}" style="background-color: #4CAF50; color: white; padding: 12px 20px; text-decoration: none; border-radius: 5px;">Reset Password</a></p>
  <p>This link will expire in 1 hour for security reasons.</p>
</body>
</html>"#;

const PASSWORD_RESET_SUCCESS_HTML: &str = r#"<!DOCTYPE html>
<html lang="en">
<head><meta charset="UTF-8"><title>Password Reset Successful</title></head>
<body style="font-family: Arial, sans-serif; line-height: 1.6; color: #333; max-width: 600px; margin: 0 auto; padding: 20px;">
  <h1 style="color: #4CAF50;">Password Reset Successful</h1>
  <p>Your password has been successfully reset.</p>
  <p>If you did not initiate this password reset, please contact our support team immediately.</p>
</body>
</html>"#;

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&'static str, &str)]) -> TemplateParams {
        pairs.iter().map(|(k, v)| (*k, v.to_string())).collect()
    }

    #[test]
    fn render_substitutes_named_parameters() {
        let out = render("Hi {name}, code {code}.", &params(&[("name", "A"), ("code", "42")]))
            .unwrap();
        assert_eq!(out, "Hi A, code 42.");
    }

    #[test]
    fn render_ignores_unused_and_non_placeholder_braces() {
        let out = render("a { b } {x}", &params(&[("x", "1"), ("y", "2")])).unwrap();
        assert_eq!(out, "a { b } 1");
    }

    #[test]
    fn render_fails_on_missing_parameter() {
        let err = render("code: {verificationCode}", &TemplateParams::new()).unwrap_err();
        assert!(matches!(err, MailError::TemplateFailed(m) if m.contains("verificationCode")));
    }

    #[test]
    fn compose_verification_email_contains_code() {
        let msg = compose(
            EmailKind::Verification,
            "a@x.com",
            &params(&[("verificationCode", "123456")]),
        )
        .unwrap();
        assert_eq!(msg.subject, "Verify your email");
        assert!(msg.html_body.contains("123456"));
        assert!(msg.text_body.contains("123456"));
        assert_eq!(msg.to, "a@x.com");
    }

    #[test]
    fn compose_reset_success_needs_no_parameters() {
        let msg = compose(EmailKind::ResetSuccess, "a@x.com", &TemplateParams::new()).unwrap();
        assert_eq!(msg.subject, "Password Reset Successful");
    }

    #[test]
    fn compose_forgot_password_embeds_link() {
        let url = "http://client.test/reset-password/abc";
        let msg = compose(EmailKind::ForgotPassword, "a@x.com", &params(&[("resetURL", url)]))
            .unwrap();
        assert!(msg.html_body.contains(&format!("href=\"{url}\"")));
    }

    #[test]
    fn render_html_escapes_markup_in_values() {
        let out = render_html("<p>{v}</p>", &params(&[("v", "a & 'b' \"c\" <d>")])).unwrap();
        assert_eq!(out, "<p>a &amp; &#39;b&#39; &quot;c&quot; &lt;d&gt;</p>");
    }

    #[test]
    fn welcome_name_cannot_inject_html() {
        let name = "<a href=\"http://evil\">click</a>";
        let msg = compose(EmailKind::Welcome, "a@x.com", &params(&[("name", name)])).unwrap();
        assert!(!msg.html_body.contains("<a href"));
        assert!(msg
            .html_body
            .contains("&lt;a href=&quot;http://evil&quot;&gt;click&lt;/a&gt;"));
        assert!(msg.text_body.contains(name));
    }
}
