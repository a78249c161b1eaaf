//! Server-rendered pages. The chat shell posts messages to `/get` and drops
//! replies into the transcript; the booking page pre-fills its form from the
//! query string carried by the generated link.

pub fn html_escape(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => output.push_str("&amp;"),
            '<' => output.push_str("&lt;"),
            '>' => output.push_str("&gt;"),
            '"' => output.push_str("&quot;"),
            '\'' => output.push_str("&#39;"),
            _ => output.push(ch),
        }
    }
    output
}

pub fn chat_page() -> &'static str {
    r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Bookline Assistant</title>
<style>
  body { font-family: system-ui, sans-serif; max-width: 640px; margin: 2rem auto; padding: 0 1rem; }
  #chat { border: 1px solid #ccc; border-radius: 8px; padding: 1rem; min-height: 320px; }
  .turn { margin: 0.5rem 0; }
  .turn.user { text-align: right; color: #1a4d8f; }
  .turn.assistant { text-align: left; color: #222; }
  #composer { display: flex; gap: 0.5rem; margin-top: 1rem; }
  #msg { flex: 1; padding: 0.5rem; }
</style>
</head>
<body>
<h1>Bookline Assistant</h1>
<div id="chat"></div>
<form id="composer">
  <input id="msg" name="msg" autocomplete="off" placeholder="Ask a question or book an appointment">
  <button type="submit">Send</button>
</form>
<script>
const chat = document.getElementById('chat');
const form = document.getElementById('composer');
const input = document.getElementById('msg');

function addTurn(role, html) {
  const div = document.createElement('div');
  div.className = 'turn ' + role;
  div.innerHTML = html;
  chat.appendChild(div);
  chat.scrollTop = chat.scrollHeight;
}

form.addEventListener('submit', async (event) => {
  event.preventDefault();
  const msg = input.value.trim();
  if (!msg) return;
  addTurn('user', msg.replace(/&/g, '&amp;').replace(/</g, '&lt;'));
  input.value = '';
  const response = await fetch('/get', {
    method: 'POST',
    headers: { 'Content-Type': 'application/x-www-form-urlencoded' },
    body: new URLSearchParams({ msg }),
  });
  addTurn('assistant', await response.text());
});
</script>
</body>
</html>
"#
}

pub fn booking_page(name: &str, email: &str, service: &str, date: &str, time: &str) -> String {
    format!(
        r#"<!doctype html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Confirm your booking</title>
<style>
  body {{ font-family: system-ui, sans-serif; max-width: 480px; margin: 2rem auto; padding: 0 1rem; }}
  label {{ display: block; margin-top: 0.75rem; }}
  input {{ width: 100%; padding: 0.5rem; }}
  button {{ margin-top: 1rem; padding: 0.5rem 1.5rem; }}
</style>
</head>
<body>
<h1>Confirm your booking</h1>
<form method="post" action="/book">
  <label>Name <input name="name" value="{name}"></label>
  <label>Email <input name="email" type="email" value="{email}"></label>
  <label>Service <input name="service" value="{service}"></label>
  <label>Date <input name="date" type="date" value="{date}"></label>
  <label>Time <input name="time" type="time" value="{time}"></label>
  <button type="submit">Confirm</button>
</form>
</body>
</html>
"#,
        name = html_escape(name),
        email = html_escape(email),
        service = html_escape(service),
        date = html_escape(date),
        time = html_escape(time),
    )
}
