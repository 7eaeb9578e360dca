use axum::response::Html;

/// GET / - Live page
pub async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

const INDEX_HTML: &str = r##"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <title>Soil Sensor Data</title>
    <style>
      body { font-family: sans-serif; margin: 2em; color: #222; }
      table { border-collapse: collapse; margin-top: 1em; }
      td, th { border: 1px solid #ccc; padding: 0.2em 0.6em; text-align: right; }
      #chart { border: 1px solid #ccc; background: #fafafa; }
      .muted { color: #888; }
    </style>
  </head>
  <body>
    <h1>Soil Sensor Data (Live)</h1>
    <ul>
      <li>Moisture: <span id="moisture">Loading...</span></li>
      <li>Raw: <span id="raw">Loading...</span></li>
      <li>Temperature: <span id="temperature">Loading...</span></li>
      <li>Calibration: <span id="bounds">Loading...</span></li>
      <li>Measured at: <span id="timestamp">Loading...</span></li>
    </ul>

    <h2>History</h2>
    <svg id="chart" width="640" height="200" viewBox="0 0 640 200">
      <polyline id="moisture-line" fill="none" stroke="#2a7ab0" stroke-width="2" points=""></polyline>
    </svg>
    <p id="history-state" class="muted"></p>
    <table>
      <thead><tr><th>Time</th><th>Moisture %</th><th>Raw</th><th>Temp &deg;C</th></tr></thead>
      <tbody id="history"></tbody>
    </table>

    <script>
      const MAX_ROWS = 50;
      let rows = [];

      function fmt(value, digits) {
        return value === null || value === undefined ? "-" : Number(value).toFixed(digits);
      }

      function showCurrent(r) {
        document.getElementById("moisture").innerText = r.moisture_percent === null ? "-" : r.moisture_percent + " %";
        document.getElementById("raw").innerText = fmt(r.moisture_raw, 1);
        document.getElementById("temperature").innerText = r.temperature === null ? "-" : fmt(r.temperature, 1) + " °C";
        document.getElementById("bounds").innerText = r.min_raw + " .. " + r.max_raw;
        document.getElementById("timestamp").innerText = new Date(r.timestamp).toLocaleString();
      }

      function render() {
        const body = document.getElementById("history");
        body.innerHTML = "";
        rows.slice().reverse().forEach(function (r) {
          const tr = document.createElement("tr");
          [new Date(r.timestamp).toLocaleTimeString(), r.moisture_percent === null ? "-" : r.moisture_percent,
           fmt(r.moisture_raw, 1), fmt(r.temperature, 1)].forEach(function (text) {
            const td = document.createElement("td");
            td.innerText = text;
            tr.appendChild(td);
          });
          body.appendChild(tr);
        });

        const points = rows.filter(function (r) { return r.moisture_percent !== null; });
        const step = points.length > 1 ? 640 / (points.length - 1) : 0;
        document.getElementById("moisture-line").setAttribute("points",
          points.map(function (r, i) { return (i * step) + "," + (200 - r.moisture_percent * 2); }).join(" "));
      }

      function push(r) {
        if (rows.length && rows[rows.length - 1].timestamp === r.timestamp) {
          return;
        }
        rows.push(r);
        if (rows.length > MAX_ROWS) {
          rows.shift();
        }
        render();
      }

      fetch("/api/history?limit=" + MAX_ROWS)
        .then(function (response) {
          if (response.status === 503) {
            document.getElementById("history-state").innerText = "History recording disabled; showing this session only.";
            return { readings: [] };
          }
          return response.json();
        })
        .then(function (data) { data.readings.forEach(push); })
        .catch(function () {});

      function connect() {
        const proto = location.protocol === "https:" ? "wss://" : "ws://";
        const socket = new WebSocket(proto + location.host + "/ws");
        socket.onmessage = function (event) {
          const r = JSON.parse(event.data);
          showCurrent(r);
          push(r);
        };
        socket.onclose = function () { setTimeout(connect, 2000); };
      }
      connect();
    </script>
  </body>
</html>
"##;
