/// HTML body of the verification email; each code digit gets its own cell.
pub fn otp_email(code: &str, valid_minutes: i64) -> String {
    let digits: String = code
        .chars()
        .map(|d| format!(r#"<div class="otp-digit">{d}</div>"#))
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="UTF-8">
  <meta name="viewport" content="width=device-width, initial-scale=1.0">
  <title>Account verification</title>
  <style>
    body {{ margin: 0; padding: 20px; background: #f5f7fa; font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', sans-serif; }}
    .container {{ max-width: 600px; margin: 0 auto; background: #ffffff; border-radius: 12px; overflow: hidden; }}
    .header {{ background: #2563eb; padding: 24px 32px; text-align: center; color: #ffffff; }}
    .content {{ padding: 40px 32px; color: #334155; line-height: 1.6; }}
    .otp-box {{ background: #f1f5f9; border-radius: 12px; padding: 24px; margin-bottom: 32px; text-align: center; }}
    .otp-digits {{ display: flex; justify-content: center; gap: 8px; }}
    .otp-digit {{ width: 48px; height: 56px; line-height: 56px; background: #ffffff; border: 2px solid rgba(37,99,235,0.2); border-radius: 8px; font-size: 24px; font-weight: 700; color: #2563eb; }}
    .expiry-notice {{ background: #fef3c7; border: 1px solid #fcd34d; border-radius: 8px; padding: 16px; color: #92400e; }}
    .footer {{ background: #f8fafc; padding: 24px 32px; border-top: 1px solid #e2e8f0; text-align: center; font-size: 12px; color: #64748b; }}
  </style>
</head>
<body>
  <div class="container">
    <div class="header"><h1>Account verification</h1></div>
    <div class="content">
      <p>Hello,</p>
      <p>Use the code below to finish verifying your account. Do not share it with anyone.</p>
      <div class="otp-box">
        <div class="otp-digits">{digits}</div>
      </div>
      <div class="expiry-notice">This code <strong>expires in {valid_minutes} minutes</strong>.</div>
      <p>If you did not request this code you can ignore this email.</p>
    </div>
    <div class="footer">This email was sent automatically, please do not reply.</div>
  </div>
</body>
</html>
"#
    )
}

pub const OTP_SUBJECT: &str = "Your verification code";
