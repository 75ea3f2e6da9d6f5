//! Embedded browser dashboard

/// Single-page dashboard served at `/`
///
/// Polls `/klines`, `/price` and `/risk` every 5 seconds; the AI summary is
/// fetched on load, on symbol change and on demand.
pub const DASHBOARD_HTML: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8">
<title>market-dash</title>
<meta name="viewport" content="width=device-width, initial-scale=1">
<script src="https://cdn.plot.ly/plotly-2.35.2.min.js"></script>
<style>
  body { font-family: -apple-system, "Segoe UI", sans-serif; margin: 0; background: #0f1419; color: #d8dee9; }
  header { display: flex; align-items: center; gap: 16px; padding: 12px 20px; background: #161b22; border-bottom: 1px solid #30363d; }
  header h1 { font-size: 18px; margin: 0; }
  select, button { background: #21262d; color: #d8dee9; border: 1px solid #30363d; padding: 4px 10px; border-radius: 4px; }
  #price { font-size: 20px; font-weight: 600; }
  main { display: grid; grid-template-columns: 3fr 1fr; gap: 16px; padding: 16px 20px; }
  .panel { background: #161b22; border: 1px solid #30363d; border-radius: 6px; padding: 12px; }
  .panel h2 { font-size: 14px; margin: 0 0 8px; color: #8b949e; text-transform: uppercase; }
  #chart { height: 520px; }
  .level { font-size: 22px; font-weight: 700; }
  .MINIMAL { color: #3fb950; } .LOW { color: #56d364; } .MEDIUM { color: #d29922; }
  .HIGH { color: #f0883e; } .CRITICAL { color: #f85149; } .UNKNOWN { color: #8b949e; }
  ul { padding-left: 18px; margin: 6px 0; }
  #summary { line-height: 1.5; white-space: pre-wrap; }
  .muted { color: #8b949e; font-size: 12px; }
</style>
</head>
<body>
<header>
  <h1>market-dash</h1>
  <select id="symbol"></select>
  <span id="price">-</span>
  <span id="updated" class="muted"></span>
</header>
<main>
  <div class="panel"><div id="chart"></div></div>
  <div>
    <div class="panel">
      <h2>Risk</h2>
      <div id="risk-level" class="level UNKNOWN">-</div>
      <div id="risk-score" class="muted"></div>
      <div id="risk-vol" class="muted"></div>
      <ul id="risk-signals"></ul>
    </div>
    <div class="panel" style="margin-top: 16px">
      <h2>AI market summary</h2>
      <div id="summary" class="muted">Loading...</div>
      <div id="summary-meta" class="muted"></div>
      <button id="refresh-summary" style="margin-top: 8px">Refresh</button>
    </div>
  </div>
</main>
<script>
const POLL_MS = 5000;
const symbolSelect = document.getElementById("symbol");

function currentSymbol() {
  return symbolSelect.value || "GBPUSD";
}

function symbolParam() {
  return encodeURIComponent(currentSymbol());
}

async function getJson(path) {
  const res = await fetch(path);
  const body = await res.json().catch(() => ({}));
  if (!res.ok) {
    const err = new Error(body.error || res.statusText);
    err.status = res.status;
    throw err;
  }
  return body;
}

async function loadSymbols() {
  let names = ["GBPUSD", "EURUSD", "BTCUSD"];
  try {
    const body = await getJson("/symbols");
    if (body.symbols.length) names = body.symbols.map(s => s.symbol);
  } catch (e) { console.warn(e); }
  symbolSelect.innerHTML = names.map(n => `<option value="${n}">${n}</option>`).join("");
}

async function loadChart() {
  const body = await getJson(`/klines?symbol=${symbolParam()}&limit=300`);
  const x = body.bars.map(b => b.start);
  const traces = [{
    type: "candlestick", name: body.symbol, x,
    open: body.bars.map(b => b.open), high: body.bars.map(b => b.high),
    low: body.bars.map(b => b.low), close: body.bars.map(b => b.close),
  }];
  for (const [name, values] of Object.entries(body.moving_averages)) {
    traces.push({ type: "scatter", mode: "lines", name: name.toUpperCase(), x, y: values, line: { width: 1.5, dash: name.startsWith("ema") ? "dot" : "solid" } });
  }
  Plotly.react("chart", traces, {
    paper_bgcolor: "#161b22", plot_bgcolor: "#161b22", font: { color: "#d8dee9" },
    margin: { t: 20, r: 20, b: 40, l: 60 }, xaxis: { rangeslider: { visible: false } },
    legend: { orientation: "h" },
  }, { responsive: true });
}

async function loadPrice() {
  try {
    const body = await getJson(`/price?symbol=${symbolParam()}`);
    document.getElementById("price").textContent = body.price.toFixed(body.price > 100 ? 2 : 5);
    document.getElementById("updated").textContent = "as of " + new Date(body.timestamp).toLocaleTimeString();
  } catch (e) {
    document.getElementById("price").textContent = "no data";
  }
}

async function loadRisk() {
  const body = await getJson(`/risk?symbol=${symbolParam()}`);
  const levelEl = document.getElementById("risk-level");
  const signals = document.getElementById("risk-signals");
  if (body.status !== "OK") {
    levelEl.className = "level UNKNOWN";
    levelEl.textContent = "INSUFFICIENT DATA";
    document.getElementById("risk-score").textContent = `${body.data_points} / ${body.required_points} points`;
    document.getElementById("risk-vol").textContent = "";
    signals.innerHTML = "";
    return;
  }
  const s = body.summary;
  levelEl.className = "level " + s.risk_level;
  levelEl.textContent = s.risk_level;
  document.getElementById("risk-score").textContent =
    `Score ${s.risk_score}/100, change ${s.price_change_pct.toFixed(2)}% over ${s.data_points} bars`;
  document.getElementById("risk-vol").textContent =
    `Volatility ${body.volatility.current_volatility.toFixed(5)} (p${body.volatility.volatility_percentile.toFixed(0)}), Z ${body.anomalies.latest_z_score.toFixed(2)}`;
  signals.innerHTML = body.signals.map(sig => `<li><b>${sig.severity}</b> ${sig.message}</li>`).join("");
}

async function loadSummary() {
  const el = document.getElementById("summary");
  const meta = document.getElementById("summary-meta");
  try {
    const body = await getJson(`/summary?symbol=${symbolParam()}`);
    el.textContent = body.summary;
    el.className = "";
    meta.textContent = `${body.model}, ${new Date(body.generated_at).toLocaleString()}${body.stale ? " (stale)" : ""}`;
  } catch (e) {
    el.className = "muted";
    el.textContent = e.message;
    meta.textContent = "";
  }
}

async function poll() {
  await Promise.allSettled([loadChart(), loadPrice(), loadRisk()]);
}

symbolSelect.addEventListener("change", () => { poll(); loadSummary(); });
document.getElementById("refresh-summary").addEventListener("click", loadSummary);

loadSymbols().then(() => { poll(); loadSummary(); setInterval(poll, POLL_MS); });
</script>
</body>
</html>
"##;
