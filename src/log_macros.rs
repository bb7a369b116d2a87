/// Write a line of tool output, e.g. a detected UID, through an `Rc522Log`
#[macro_export]
macro_rules! output {
  ($log: expr, $($args: tt)+) => {
    $log.output(format_args!($($args)+))
  };
}

/// Report a recoverable problem through an `Rc522Log`
#[macro_export]
macro_rules! warning {
  ($log: expr, $($args: tt)+) => {
    $log.warning(format_args!($($args)+))
  };
}

/// Report a fatal problem through an `Rc522Log`
#[macro_export]
macro_rules! error {
  ($log: expr, $($args: tt)+) => {
    $log.error(format_args!($($args)+))
  };
}
