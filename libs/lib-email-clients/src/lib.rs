pub mod sendpulse;
