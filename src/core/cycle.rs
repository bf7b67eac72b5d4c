//! Parameter cycling tables for the interactive change commands.
//!
//! Pure functions mapping a current setting to the next one. The baud ladder
//! is the standard UART rate ladder, which is not a clean doubling sequence:
//! the 38400 <-> 57600 step is irregular and must stay that way.

use crate::domain::config::{FlowMode, ParityMode};

pub const BAUD_MIN: u32 = 300;
pub const BAUD_MAX: u32 = 115200;

/// Next baud rate up the ladder, clamped to [300, 115200].
pub fn baud_up(baud: u32) -> u32 {
    let next = if baud < BAUD_MIN {
        BAUD_MIN
    } else if baud == 38400 {
        57600
    } else {
        baud.saturating_mul(2)
    };
    next.min(BAUD_MAX)
}

/// Next baud rate down the ladder, clamped to [300, 115200].
pub fn baud_down(baud: u32) -> u32 {
    let next = if baud > BAUD_MAX {
        BAUD_MAX
    } else if baud == 57600 {
        38400
    } else {
        baud / 2
    };
    next.max(BAUD_MIN)
}

/// Flow control cycles none -> RTS/CTS -> xon/xoff -> none.
pub fn flow_next(flow: FlowMode) -> FlowMode {
    match flow {
        FlowMode::None => FlowMode::Hardware,
        FlowMode::Hardware => FlowMode::Software,
        FlowMode::Software => FlowMode::None,
    }
}

/// Parity cycles none -> even -> odd -> none.
pub fn parity_next(parity: ParityMode) -> ParityMode {
    match parity {
        ParityMode::None => ParityMode::Even,
        ParityMode::Even => ParityMode::Odd,
        ParityMode::Odd => ParityMode::None,
    }
}

/// Data bits increment 5 -> 6 -> 7 -> 8 and wrap back to 5.
/// Values outside 5..=8 normalize onto the cycle.
pub fn databits_next(bits: u8) -> u8 {
    if !(5..=8).contains(&bits) {
        return 5;
    }
    if bits == 8 {
        5
    } else {
        bits + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_baud_up_ladder() {
        assert_eq!(baud_up(300), 600);
        assert_eq!(baud_up(9600), 19200);
        assert_eq!(baud_up(38400), 57600);
        assert_eq!(baud_up(57600), 115200);
        assert_eq!(baud_up(115200), 115200);
    }

    #[test]
    fn test_baud_up_reaches_max_and_stays() {
        let mut baud = 300;
        for _ in 0..32 {
            baud = baud_up(baud);
        }
        assert_eq!(baud, 115200);
        assert_eq!(baud_up(baud), 115200);
    }

    #[test]
    fn test_baud_down_ladder() {
        assert_eq!(baud_down(115200), 57600);
        assert_eq!(baud_down(57600), 38400);
        assert_eq!(baud_down(38400), 19200);
        assert_eq!(baud_down(600), 300);
        assert_eq!(baud_down(300), 300);
    }

    #[test]
    fn test_baud_out_of_domain() {
        assert_eq!(baud_up(0), 300);
        assert_eq!(baud_up(150), 300);
        assert_eq!(baud_down(230400), 115200);
    }

    #[test]
    fn test_flow_cycle_period_three() {
        let mut flow = FlowMode::None;
        flow = flow_next(flow);
        assert_eq!(flow, FlowMode::Hardware);
        flow = flow_next(flow);
        assert_eq!(flow, FlowMode::Software);
        flow = flow_next(flow);
        assert_eq!(flow, FlowMode::None);
    }

    #[test]
    fn test_parity_cycle_period_three() {
        let mut parity = ParityMode::None;
        parity = parity_next(parity);
        assert_eq!(parity, ParityMode::Even);
        parity = parity_next(parity);
        assert_eq!(parity, ParityMode::Odd);
        parity = parity_next(parity);
        assert_eq!(parity, ParityMode::None);
    }

    #[test]
    fn test_databits_cycle_period_four() {
        assert_eq!(databits_next(5), 6);
        assert_eq!(databits_next(6), 7);
        assert_eq!(databits_next(7), 8);
        assert_eq!(databits_next(8), 5);
    }

    #[test]
    fn test_databits_out_of_domain() {
        assert_eq!(databits_next(0), 5);
        assert_eq!(databits_next(9), 5);
    }
}
