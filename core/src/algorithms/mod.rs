pub mod sizing_math;
