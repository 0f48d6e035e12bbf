/// Generates `Display` and `FromStr` impls for simple string-valued option
/// enums.
///
/// `FromStr` failures become [`DbfError::InvalidConfig`](crate::error::DbfError::InvalidConfig)
/// naming the option key, so callers can report them directly.
///
/// ```ignore
/// str_enum!(Utf8Strategy, lowercase, "invalid.utf8",
///     Lossy => "lossy", "replace";
///     Null => "null");
/// ```
///
/// # Normalization modes
///
/// - `lowercase`: `to_lowercase().replace('-', "_")`
macro_rules! str_enum {
    ($enum_name:ident, $norm:ident, $key:literal,
        $( $variant:ident => $display:literal $(, $alias:literal)* );+ $(;)?
    ) => {
        impl std::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                let s = match self {
                    $( Self::$variant => $display, )+
                };
                f.write_str(s)
            }
        }

        impl std::str::FromStr for $enum_name {
            type Err = crate::error::DbfError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let normalized = str_enum!(@normalize $norm s.trim());
                match normalized.as_str() {
                    $( $display $(| $alias)* => Ok(Self::$variant), )+
                    other => Err(crate::error::DbfError::InvalidConfig {
                        key: $key.to_string(),
                        message: format!(
                            "unknown value '{other}', expected one of: {}",
                            [$( $display ),+].join(", ")
                        ),
                    }),
                }
            }
        }
    };

    (@normalize lowercase $s:expr) => { $s.to_lowercase().replace('-', "_") };
}
