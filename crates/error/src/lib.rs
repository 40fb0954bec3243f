//! TEAM_450: Error infrastructure for the user-program subsystem.
//!
//! Provides the `define_kernel_error!` macro for consistent error type definitions
//! and the [`KernelError`] trait it implements, so that the syscall gateway can
//! log any subsystem's error without knowing its concrete type.
//!
//! ## Usage
//!
//! ### Simple errors (no inner data)
//! ```ignore
//! define_kernel_error! {
//!     pub enum MemoryError(0x02) {
//!         NullPointer = 0x01 => "Null user pointer",
//!         NotMapped = 0x03 => "User page not mapped",
//!     }
//! }
//! ```
//!
//! ### Nested errors (with inner error type)
//! ```ignore
//! define_kernel_error! {
//!     pub enum SyscallError(0x05) {
//!         InvalidMemoryAccess(MemoryError) = 0x01 => "Invalid user memory access",
//!         ResourceNotFound = 0x02 => "Resource not found",
//!     }
//! }
//! ```

#![no_std]

/// Common view over every error declared with [`define_kernel_error!`].
///
/// Codes are `(subsystem << 8) | variant`, rendered as `E{code:04X}`.
pub trait KernelError: core::fmt::Debug + core::fmt::Display + Copy {
    /// Subsystem identifier for this error type.
    const SUBSYSTEM: u8;

    /// Get numeric error code for debugging.
    fn code(&self) -> u16;

    /// Get error name for logging.
    fn name(&self) -> &'static str;
}

/// Macro to define a kernel error type with consistent handling.
///
/// Supports both simple variants and nested variants containing inner errors.
#[macro_export]
macro_rules! define_kernel_error {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident($subsystem:literal) {
            $(
                $(#[$variant_meta:meta])*
                $variant:ident $(($inner:ty))? = $code:literal => $desc:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq)]
        $vis enum $name {
            $(
                $(#[$variant_meta])*
                $variant $(($inner))?,
            )*
        }

        impl $name {
            /// Subsystem identifier for this error type.
            pub const SUBSYSTEM: u8 = $subsystem;

            /// Get numeric error code for debugging.
            pub const fn code(&self) -> u16 {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? _unused) => {
                            (($subsystem as u16) << 8) | $code
                        }
                    )*
                }
            }

            /// Get error name for logging.
            pub const fn name(&self) -> &'static str {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? _unused) => {
                            $desc
                        }
                    )*
                }
            }
        }

        impl $crate::KernelError for $name {
            const SUBSYSTEM: u8 = $subsystem;

            fn code(&self) -> u16 {
                $name::code(self)
            }

            fn name(&self) -> &'static str {
                $name::name(self)
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                match self {
                    $(
                        $crate::define_kernel_error!(@pattern $variant $(($inner))? inner) => {
                            $crate::define_kernel_error!(@display_body self f $desc $(($inner))? inner)
                        }
                    )*
                }
            }
        }

        impl core::error::Error for $name {}
    };

    // Helper to generate patterns
    (@pattern $variant:ident ($inner:ty) $bind:ident) => { Self::$variant($bind) };
    (@pattern $variant:ident $bind:ident) => { Self::$variant };

    // Helper to generate display bodies
    (@display_body $self:ident $f:ident $desc:literal ($inner:ty) $bind:ident) => {
        write!($f, "E{:04X}: {} ({})", $self.code(), $desc, $bind)
    };
    (@display_body $self:ident $f:ident $desc:literal $bind:ident) => {
        write!($f, "E{:04X}: {}", $self.code(), $desc)
    };
}
