pub fn print_banner() {
    let logo = r#"
  _               _  _                      _
 | |    ___  __ _| || |___  _  _ _ __  __| |
 | |__ / _ \/ _` | __ / _ \| || | '_ \/ _` |
 |____|\___/\__, |_||_|\___/\_,_|_||_|\__,_|
            |___/
"#;
    println!("{}", console::style(logo).cyan());
    println!(
        "  {} v{} -- firewall log anomaly detection\n",
        console::style("LogHound").bold(),
        loghound_core::VERSION,
    );
}
