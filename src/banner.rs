// src/banner.rs

/// Prints the application startup banner to the console.
pub fn print_banner() {
    let banner = r#"
               _      _
  ___ ___   __| | ___| | ___ _ __  ___
 / __/ _ \ / _` |/ _ \ |/ _ \ '_ \/ __|
| (_| (_) | (_| |  __/ |  __/ | | \__ \
 \___\___/ \__,_|\___|_|\___|_| |_|___/

    Run it, then ask why it broke
"#;
    println!("{}", banner);
}
