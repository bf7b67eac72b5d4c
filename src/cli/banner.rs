use crate::domain::config::SessionSettings;
use crate::domain::error::SerComResult;

fn yes_no(flag: bool) -> &'static str {
    if flag {
        "yes"
    } else {
        "no"
    }
}

/// Print the effective configuration before the console goes raw.
pub fn print_banner(settings: &SessionSettings) {
    println!("sercom v{}", env!("CARGO_PKG_VERSION"));
    println!();
    println!("port is        : {}", settings.port.display());
    println!("flowcontrol    : {}", settings.flow);
    println!("baudrate is    : {}", settings.baud);
    println!("parity is      : {}", settings.parity);
    println!("databits are   : {}", settings.databits);
    println!("escape is      : {}", settings.escape_label());
    println!("noinit is      : {}", yes_no(settings.no_init));
    println!("noreset is     : {}", yes_no(settings.no_reset));
    println!("nolock is      : {}", yes_no(settings.no_lock));
    println!("send_cmd is    : {}", settings.send_cmd);
    println!("receive_cmd is : {}", settings.receive_cmd);
    println!("timestamp is   : {}", if settings.timestamp { "on" } else { "off" });
    println!();
}

/// Print the serial ports visible on this machine.
pub fn list_ports() -> SerComResult<()> {
    let ports = serialport::available_ports()?;
    if ports.is_empty() {
        println!("No serial ports found");
        return Ok(());
    }
    println!("Available serial ports:");
    for port in ports {
        println!("  {}", port.port_name);
    }
    Ok(())
}
