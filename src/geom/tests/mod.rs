mod test_curve_basic;
mod test_topology_basic;
mod test_weld_basic;
