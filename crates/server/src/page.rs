// Companion chat index page.
//
// The transcript is rendered server-side with the same view rules the
// client uses, and the inline script keeps it current through `/send` and
// `/toggle_mode`.

use client_core::view::{escape_html, render, RenderOptions};
use shared::{domain::Mode, protocol::ChatSnapshot};

const MODES: &[&str] = &[Mode::FITNESS, Mode::CHAT, Mode::STORY];

pub fn build_index_html(title: &str, current_mode: &Mode, snapshot: &ChatSnapshot) -> String {
    let transcript = render(
        &snapshot.messages,
        &snapshot.state,
        &RenderOptions::default(),
    )
    .to_html();
    let title = escape_html(title);
    let buttons: String = MODES
        .iter()
        .map(|mode| {
            let active = if current_mode.is(mode) { " active" } else { "" };
            format!(
                r#"<button type="button" class="mode-button{active}" onclick="toggleMode('{mode}')">{mode}</button>"#
            )
        })
        .collect();

    format!(
        r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width,initial-scale=1">
<title>{title}</title>
<style>
body{{font-family:-apple-system,'Segoe UI',sans-serif;background:#fff5fa;margin:0;height:100vh;display:flex;flex-direction:column}}
header{{padding:12px 20px;display:flex;gap:8px;align-items:center;border-bottom:1px solid #f3c6dc}}
header h1{{font-size:16px;margin:0 auto 0 0;color:#c2185b}}
.mode-button{{padding:6px 12px;border:1px solid #f3c6dc;border-radius:6px;background:#fff;cursor:pointer}}
.mode-button.active{{background:#f8bbd0}}
#messages{{flex:1;overflow-y:auto;padding:16px 20px;display:flex;flex-direction:column;gap:8px}}
.chat-message{{max-width:80%;padding:8px 12px;border-radius:10px;line-height:1.4}}
.chat-message.user{{align-self:flex-end;background:#e3f2fd}}
.chat-message.monika{{align-self:flex-start;background:#fce4ec}}
.typing-indicator{{color:#888;font-style:italic}}
.mood-bar{{height:8px;background:#eee;border-radius:4px;overflow:hidden}}
.mood-progress{{height:100%;background:#ec407a}}
#chat-form{{display:flex;gap:8px;padding:12px 20px;border-top:1px solid #f3c6dc}}
#message{{flex:1;padding:8px 12px}}
</style>
</head>
<body>
<header><h1>{title}</h1>{buttons}</header>
<div id="messages">{transcript}</div>
<form id="chat-form">
  <input id="message" name="message" autocomplete="off" placeholder="Say something..." />
  <button type="submit">Send</button>
</form>
<script>
const box=document.getElementById("messages");
const input=document.getElementById("message");
function updateChat(data){{
  const state=data.state||{{typing:false,progress:0}};
  box.innerHTML="";
  for(const msg of data.messages||[]){{
    const el=document.createElement("div");
    el.className="chat-message "+msg.role;
    el.innerHTML=msg.content;
    box.appendChild(el);
  }}
  if(state.typing){{
    const t=document.createElement("div");
    t.className="typing-indicator";
    t.textContent="Monika is typing...";
    box.appendChild(t);
  }}
  const bar=document.createElement("div");
  bar.className="mood-bar";
  const fill=document.createElement("div");
  fill.className="mood-progress";
  fill.style.width=(state.progress*100)+"%";
  bar.appendChild(fill);
  box.appendChild(bar);
  box.scrollTop=box.scrollHeight;
}}
async function post(url,field,value){{
  const res=await fetch(url,{{method:"POST",body:new URLSearchParams({{[field]:value}})}});
  const text=await res.text();
  if(!res.ok)throw new Error(text);
  return JSON.parse(text);
}}
document.getElementById("chat-form").addEventListener("submit",async e=>{{
  e.preventDefault();
  const message=input.value.trim();
  if(!message)return;
  try{{updateChat(await post("/send","message",message));input.value="";}}
  catch(err){{console.error("Error:",err.message);}}
}});
async function toggleMode(mode){{
  try{{updateChat(await post("/toggle_mode","mode",mode));}}
  catch(err){{console.error("Error:",err.message);}}
}}
window.toggleMode=toggleMode;
box.scrollTop=box.scrollHeight;
</script>
</body>
</html>"##
    )
}
