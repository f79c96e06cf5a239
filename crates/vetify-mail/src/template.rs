//! Verification-code email body.

fn escape(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Render the Portuguese verification email for `email` carrying `code`.
pub fn code_email(email: &str, code: &str) -> String {
    format!(
        r#"<html>
  <head>
    <title>Verificação de Email</title>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
  </head>
  <body>
    <div style="margin: 0 auto; padding: 16px;">
      <table style="width: 384px;">
        <tbody>
          <tr>
            <td>
              <p>
                Por favor, use o código de verificação abaixo para confirmar que o endereço de
                e-mail pertence à sua Empresa.
              </p>
              <p>Código de verificação: {code}</p>
              <p>
                Esta mensagem foi enviada para {email} a seu pedido.
              </p>
            </td>
          </tr>
        </tbody>
      </table>
    </div>
  </body>
</html>
"#,
        code = escape(code),
        email = escape(email),
    )
}
