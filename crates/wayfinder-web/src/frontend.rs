//! Embedded single-page HTML frontend.
//!
//! A trip form with inline CSS and JavaScript that posts to `/api/plan` and
//! renders the answer, sources and confidence.  No external assets.

/// The complete HTML frontend as a static string.
pub const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>Wayfinder</title>
<style>
*,*::before,*::after{box-sizing:border-box;margin:0;padding:0}
:root{
  --bg:#10222b;
  --bg-secondary:#173440;
  --bg-input:#1f4757;
  --text:#e8eef0;
  --text-muted:#8fa6ad;
  --accent:#f2a541;
  --border:#2a4c59;
  --success:#4ecca3;
  --warning:#f0a500;
  --danger:#e94560;
}
html,body{min-height:100%;font-family:-apple-system,BlinkMacSystemFont,"Segoe UI",Roboto,Helvetica,Arial,sans-serif;background:var(--bg);color:var(--text)}
.header{padding:14px 20px;background:var(--bg-secondary);border-bottom:1px solid var(--border)}
.header h1{font-size:18px;font-weight:600;letter-spacing:.5px}
.header h1 span{color:var(--accent)}
main{max-width:820px;margin:0 auto;padding:20px;display:flex;flex-direction:column;gap:16px}
form{display:grid;grid-template-columns:2fr 1fr;gap:10px}
form .wide{grid-column:1 / -1}
label{font-size:12px;color:var(--text-muted);display:flex;flex-direction:column;gap:4px}
input,textarea{background:var(--bg-input);color:var(--text);border:1px solid var(--border);border-radius:8px;padding:10px;font-size:15px;font-family:inherit}
textarea{resize:vertical;min-height:60px}
button{grid-column:1 / -1;background:var(--accent);color:#10222b;border:0;border-radius:8px;padding:12px;font-size:15px;font-weight:600;cursor:pointer}
button:disabled{opacity:.5;cursor:wait}
.card{background:var(--bg-secondary);border:1px solid var(--border);border-radius:12px;padding:16px 18px;line-height:1.6}
.card h2{font-size:14px;color:var(--text-muted);margin-bottom:8px;font-weight:500}
.answer{white-space:pre-wrap}
.meta{display:flex;gap:12px;flex-wrap:wrap;font-size:13px;color:var(--text-muted)}
.badge{padding:2px 8px;border-radius:999px;background:var(--bg-input)}
.conf-high{color:var(--success)}
.conf-mid{color:var(--warning)}
.conf-low{color:var(--danger)}
.error{color:var(--danger)}
ul{padding-left:18px}
.hidden{display:none}
</style>
</head>
<body>
<div class="header"><h1>Way<span>finder</span></h1></div>
<main>
  <form id="trip">
    <label>City<input id="city" required placeholder="Barcelona"></label>
    <label>Days<input id="days" type="number" min="1" value="3" required></label>
    <label class="wide">Preferences<input id="preferences" placeholder="art, food"></label>
    <label class="wide">Question (optional)<textarea id="query" placeholder="Plan a 3-day art and food trip"></textarea></label>
    <button id="submit" type="submit">Ask</button>
  </form>
  <div id="error" class="card error hidden"></div>
  <div id="result" class="hidden">
    <div class="card">
      <div class="meta" id="meta"></div>
    </div>
    <div class="card"><h2>Answer</h2><div class="answer" id="answer"></div></div>
    <div class="card" id="weather-card"><h2>Weather</h2><ul id="weather"></ul></div>
    <div class="card" id="pois-card"><h2>Places</h2><ul id="pois"></ul></div>
    <div class="card"><h2>Sources</h2><ul id="sources"></ul></div>
  </div>
</main>
<script>
const $ = (id) => document.getElementById(id);

function list(el, items) {
  el.innerHTML = '';
  for (const text of items) {
    const li = document.createElement('li');
    li.textContent = text;
    el.appendChild(li);
  }
}

function badge(text, cls) {
  const span = document.createElement('span');
  span.className = 'badge ' + (cls || '');
  span.textContent = text;
  return span;
}

function render(data) {
  const meta = $('meta');
  meta.innerHTML = '';
  const c = data.confidence;
  const cls = c >= 0.7 ? 'conf-high' : c >= 0.4 ? 'conf-mid' : 'conf-low';
  meta.appendChild(badge('intent: ' + data.intent));
  meta.appendChild(badge('confidence: ' + c.toFixed(2), cls));
  meta.appendChild(badge(data.timings.total_ms + ' ms'));

  $('answer').textContent = data.plan;

  if (data.weather) {
    $('weather-card').classList.remove('hidden');
    list($('weather'), data.weather.days.map((d) => {
      const rain = d.precipitation_probability == null ? '' : ', ' + d.precipitation_probability + '% rain';
      return d.date + ': ' + Math.round(d.temp_min_c) + '-' + Math.round(d.temp_max_c) + '°C' + rain;
    }));
  } else {
    $('weather-card').classList.add('hidden');
  }

  $('pois-card').classList.toggle('hidden', data.pois.length === 0);
  list($('pois'), data.pois.map((p) => p.category ? p.name + ' (' + p.category + ')' : p.name));
  list($('sources'), data.sources);

  $('result').classList.remove('hidden');
}

$('trip').addEventListener('submit', async (e) => {
  e.preventDefault();
  $('submit').disabled = true;
  $('error').classList.add('hidden');
  const body = {
    city: $('city').value,
    days: parseInt($('days').value, 10),
    preferences: $('preferences').value || null,
    query: $('query').value || null,
  };
  try {
    const res = await fetch('/api/plan', {
      method: 'POST',
      headers: { 'Content-Type': 'application/json' },
      body: JSON.stringify(body),
    });
    const data = await res.json();
    if (!res.ok) throw new Error(data.error || res.statusText);
    render(data);
  } catch (err) {
    $('error').textContent = err.message;
    $('error').classList.remove('hidden');
    $('result').classList.add('hidden');
  } finally {
    $('submit').disabled = false;
  }
});
</script>
</body>
</html>
"##;
